//! Unit tests for timelock scheduling

use chain_clients_common::EscrowPhase;
use rand::Rng;
use resolver::timelock::{compute_time_lock, ConfigError, TimeLockDurations};

const DEPLOYED_AT: u64 = 1_700_000_000;

fn durations(w: u64, pw: u64, c: u64, pc: u64) -> TimeLockDurations {
    TimeLockDurations {
        withdrawal_secs: w,
        public_withdrawal_secs: pw,
        cancellation_secs: c,
        public_cancellation_secs: pc,
    }
}

// ============================================================================
// CONSTRUCTION TESTS
// ============================================================================

/// What is tested: default durations produce the expected absolute deadlines
/// Why: Defaults are what production orders use when the config omits [timelock]
#[test]
fn test_default_time_lock() {
    let lock = compute_time_lock(DEPLOYED_AT, &TimeLockDurations::default()).unwrap();
    assert_eq!(lock.deployed_at, DEPLOYED_AT);
    assert_eq!(lock.private_withdrawal, DEPLOYED_AT + 10);
    assert_eq!(lock.public_withdrawal, DEPLOYED_AT + 60);
    assert_eq!(lock.private_cancellation, DEPLOYED_AT + 86_400);
    assert_eq!(lock.public_cancellation, DEPLOYED_AT + 172_800);
}

/// What is tested: random increasing durations always yield strictly increasing deadlines
/// Why: Escrows reject timelocks whose phases overlap
#[test]
fn test_random_durations_are_monotonic() {
    let mut rng = rand::thread_rng();
    for _ in 0..1_000 {
        let w = rng.gen_range(0..1_000);
        let pw = w + rng.gen_range(1..1_000);
        let c = pw + rng.gen_range(1..100_000);
        let pc = c + rng.gen_range(1..100_000);
        let now = rng.gen_range(0..u32::MAX as u64 / 2);

        let lock = compute_time_lock(now, &durations(w, pw, c, pc)).unwrap();
        assert!(lock.deployed_at <= lock.private_withdrawal);
        assert!(lock.private_withdrawal < lock.public_withdrawal);
        assert!(lock.public_withdrawal < lock.private_cancellation);
        assert!(lock.private_cancellation < lock.public_cancellation);
    }
}

/// What is tested: equal or decreasing durations are rejected
/// Why: Ordering is only checked at construction, so it must never be skipped
#[test]
fn test_non_increasing_durations_rejected() {
    let cases = [
        durations(10, 10, 100, 200),
        durations(10, 60, 50, 200),
        durations(10, 60, 200, 200),
        durations(100, 60, 200, 300),
    ];
    for case in cases {
        assert!(matches!(
            compute_time_lock(DEPLOYED_AT, &case),
            Err(ConfigError::NotIncreasing { .. })
        ));
    }
}

/// What is tested: offsets or deployment times beyond 32 bits are rejected
/// Why: Each phase occupies a 32-bit slot in the packed on-chain word
#[test]
fn test_overflowing_values_rejected() {
    let too_long = durations(10, 60, 100, u32::MAX as u64 + 1);
    assert_eq!(
        compute_time_lock(DEPLOYED_AT, &too_long),
        Err(ConfigError::Overflow(u32::MAX as u64 + 1))
    );

    let late = u32::MAX as u64 + 10;
    assert_eq!(
        compute_time_lock(late, &TimeLockDurations::default()),
        Err(ConfigError::Overflow(late))
    );
}

// ============================================================================
// PHASE TESTS
// ============================================================================

/// What is tested: phase_at at and around every boundary
/// Why: The monitor decides between release and expiry from the phase
#[test]
fn test_phase_boundaries() {
    let lock = compute_time_lock(DEPLOYED_AT, &durations(10, 60, 100, 200)).unwrap();

    assert_eq!(lock.phase_at(DEPLOYED_AT), None);
    assert_eq!(lock.phase_at(DEPLOYED_AT + 9), None);
    assert_eq!(lock.phase_at(DEPLOYED_AT + 10), Some(EscrowPhase::PrivateWithdrawal));
    assert_eq!(lock.phase_at(DEPLOYED_AT + 59), Some(EscrowPhase::PrivateWithdrawal));
    assert_eq!(lock.phase_at(DEPLOYED_AT + 60), Some(EscrowPhase::PublicWithdrawal));
    assert_eq!(lock.phase_at(DEPLOYED_AT + 100), Some(EscrowPhase::PrivateCancellation));
    assert_eq!(lock.phase_at(DEPLOYED_AT + 200), Some(EscrowPhase::PublicCancellation));
    assert_eq!(lock.phase_at(u64::MAX), Some(EscrowPhase::PublicCancellation));
}

/// What is tested: remaining time to public cancellation saturates at zero
/// Why: The API reports it for orders long past their deadlines
#[test]
fn test_remaining_until_public_cancellation() {
    let lock = compute_time_lock(DEPLOYED_AT, &durations(10, 60, 100, 200)).unwrap();
    assert_eq!(lock.remaining_until_public_cancellation(DEPLOYED_AT), 200);
    assert_eq!(lock.remaining_until_public_cancellation(DEPLOYED_AT + 150), 50);
    assert_eq!(lock.remaining_until_public_cancellation(DEPLOYED_AT + 500), 0);
}

// ============================================================================
// PACKING TESTS
// ============================================================================

/// What is tested: packed word layout (deployedAt in the low slot, offsets above)
/// Why: The escrow factory decodes phases from fixed 32-bit slots
#[test]
fn test_packed_layout() {
    let lock = compute_time_lock(0x0102_0304, &durations(10, 60, 100, 200)).unwrap();
    let word = lock.packed();

    let slot = |i: usize| {
        let end = 32 - i * 4;
        u32::from_be_bytes(word[end - 4..end].try_into().unwrap())
    };
    assert_eq!(slot(0), 0x0102_0304);
    assert_eq!(slot(1), 10);
    assert_eq!(slot(2), 60);
    assert_eq!(slot(3), 100);
    assert_eq!(slot(4), 200);
    assert!(word[..12].iter().all(|b| *b == 0));
}

/// What is tested: durations deserialize with defaults for missing keys
/// Why: Operators may override a single duration in [timelock]
#[test]
fn test_durations_partial_toml() {
    let parsed: TimeLockDurations = toml::from_str("cancellation_secs = 3600").unwrap();
    assert_eq!(parsed.withdrawal_secs, 10);
    assert_eq!(parsed.public_withdrawal_secs, 60);
    assert_eq!(parsed.cancellation_secs, 3600);
    assert_eq!(parsed.public_cancellation_secs, 172_800);
}
