//! Unit tests for secret and hashlock generation

use resolver::crypto::{generate_secret, hash_secret, hex32, keccak256, HashLock, Secret};
use std::collections::HashSet;

// ============================================================================
// KECCAK256 TESTS
// ============================================================================

/// What is tested: keccak256 against the well-known empty-input digest
/// Why: Escrows verify the secret with EVM keccak256, not NIST SHA3-256
#[test]
fn test_keccak256_empty_input() {
    assert_eq!(
        hex::encode(keccak256(b"")),
        "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
}

/// What is tested: hash_secret equals keccak256 of the raw secret bytes
/// Why: The on-chain check is keccak256(secret) == hashlock
#[test]
fn test_hash_secret_is_keccak_of_bytes() {
    let secret = Secret::from_bytes([7u8; 32]);
    assert_eq!(hash_secret(&secret), keccak256(&[7u8; 32]));
}

// ============================================================================
// HASHLOCK TESTS
// ============================================================================

/// What is tested: the same secret always yields the same hashlock
/// Why: The hashlock is a pure commitment to the secret
#[test]
fn test_hashlock_deterministic() {
    let secret = Secret::from_bytes([0xabu8; 32]);
    let a = HashLock::new(secret.clone());
    let b = HashLock::new(secret);
    assert_eq!(a.hash, b.hash);
    assert_eq!(a.hash_hex(), b.hash_hex());
    assert!(a.hash_hex().starts_with("0x"));
    assert_eq!(a.hash_hex().len(), 66);
}

/// What is tested: 10,000 generated secrets and hashlocks are pairwise distinct
/// Why: A repeated secret would let one order's release unlock another
#[test]
fn test_generated_secrets_are_unique() {
    let mut secrets = HashSet::new();
    let mut hashes = HashSet::new();
    for _ in 0..10_000 {
        let lock = HashLock::generate();
        assert!(secrets.insert(*lock.secret.as_bytes()));
        assert!(hashes.insert(lock.hash));
    }
}

/// What is tested: generated secret hashes to the stored commitment
/// Why: A mismatched pair would make every release revert
#[test]
fn test_generated_hashlock_matches_secret() {
    let lock = HashLock::generate();
    assert_eq!(lock.hash, hash_secret(&lock.secret));
    assert_ne!(*generate_secret().as_bytes(), *lock.secret.as_bytes());
}

/// What is tested: Debug output of a secret never contains its bytes
/// Why: Secrets must not leak into logs before release
#[test]
fn test_secret_debug_is_redacted() {
    let secret = Secret::from_bytes([0x42u8; 32]);
    let debug = format!("{:?}", secret);
    assert!(!debug.contains("42"));
    assert!(debug.contains("redacted"));

    let lock_debug = format!("{:?}", HashLock::new(secret.clone()));
    assert!(!lock_debug.contains(&secret.to_hex()[2..]));
}

// ============================================================================
// HEX32 TESTS
// ============================================================================

/// What is tested: hex32::parse accepts prefixed and bare hex, rejects bad lengths
/// Why: Order hashes and secrets travel as hex strings through the API and storage
#[test]
fn test_hex32_parse() {
    let prefixed = format!("0x{}", "11".repeat(32));
    assert_eq!(hex32::parse(&prefixed).unwrap(), [0x11u8; 32]);
    assert_eq!(hex32::parse(&"11".repeat(32)).unwrap(), [0x11u8; 32]);

    assert!(hex32::parse("0x1234").is_err());
    assert!(hex32::parse(&"zz".repeat(32)).is_err());
}

/// What is tested: a secret survives a JSON round trip through storage encoding
/// Why: Persisted orders must release with the original secret after a restart
#[test]
fn test_secret_json_encoding() {
    let lock = HashLock::generate();
    let json = serde_json::to_string(&lock).unwrap();
    let restored: HashLock = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, lock);
}
