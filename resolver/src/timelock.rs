//! TimeLock scheduling
//!
//! A timelock is the deployment time plus four strictly increasing offsets.
//! Construction is the only place the ordering is checked; every `TimeLock`
//! value in the process is therefore valid.

use chain_clients_common::EscrowPhase;
use serde::{Deserialize, Serialize};

/// Relative phase durations in seconds, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLockDurations {
    /// Offset at which the resolver may withdraw privately
    #[serde(default = "default_withdrawal")]
    pub withdrawal_secs: u64,
    /// Offset at which anyone with the secret may withdraw
    #[serde(default = "default_public_withdrawal")]
    pub public_withdrawal_secs: u64,
    /// Offset at which the payer may cancel
    #[serde(default = "default_cancellation")]
    pub cancellation_secs: u64,
    /// Offset at which anyone may cancel for the payer
    #[serde(default = "default_public_cancellation")]
    pub public_cancellation_secs: u64,
}

fn default_withdrawal() -> u64 {
    10
}

fn default_public_withdrawal() -> u64 {
    60
}

fn default_cancellation() -> u64 {
    86_400
}

fn default_public_cancellation() -> u64 {
    172_800
}

impl Default for TimeLockDurations {
    fn default() -> Self {
        Self {
            withdrawal_secs: default_withdrawal(),
            public_withdrawal_secs: default_public_withdrawal(),
            cancellation_secs: default_cancellation(),
            public_cancellation_secs: default_public_cancellation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "timelock durations must be strictly increasing: withdrawal {withdrawal} < public_withdrawal {public_withdrawal} < cancellation {cancellation} < public_cancellation {public_cancellation}"
    )]
    NotIncreasing {
        withdrawal: u64,
        public_withdrawal: u64,
        cancellation: u64,
        public_cancellation: u64,
    },
    #[error("timelock value {0} does not fit in a 32-bit slot")]
    Overflow(u64),
}

impl TimeLockDurations {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.withdrawal_secs < self.public_withdrawal_secs
            && self.public_withdrawal_secs < self.cancellation_secs
            && self.cancellation_secs < self.public_cancellation_secs;
        if !ordered {
            return Err(ConfigError::NotIncreasing {
                withdrawal: self.withdrawal_secs,
                public_withdrawal: self.public_withdrawal_secs,
                cancellation: self.cancellation_secs,
                public_cancellation: self.public_cancellation_secs,
            });
        }
        // public_cancellation is the largest offset
        check_slot(self.public_cancellation_secs)?;
        Ok(())
    }
}

fn check_slot(value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::Overflow(value))
}

/// Absolute phase deadlines (unix seconds) for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLock {
    pub deployed_at: u64,
    pub private_withdrawal: u64,
    pub public_withdrawal: u64,
    pub private_cancellation: u64,
    pub public_cancellation: u64,
}

/// Computes absolute deadlines from the deployment time.
///
/// Fails if the durations are not strictly increasing or do not fit the
/// on-chain 32-bit slots.
pub fn compute_time_lock(
    deployed_at: u64,
    durations: &TimeLockDurations,
) -> Result<TimeLock, ConfigError> {
    durations.validate()?;
    check_slot(deployed_at)?;
    Ok(TimeLock {
        deployed_at,
        private_withdrawal: deployed_at + durations.withdrawal_secs,
        public_withdrawal: deployed_at + durations.public_withdrawal_secs,
        private_cancellation: deployed_at + durations.cancellation_secs,
        public_cancellation: deployed_at + durations.public_cancellation_secs,
    })
}

impl TimeLock {
    /// Phase at `now`; `None` before the private withdrawal deadline.
    pub fn phase_at(&self, now: u64) -> Option<EscrowPhase> {
        if now >= self.public_cancellation {
            Some(EscrowPhase::PublicCancellation)
        } else if now >= self.private_cancellation {
            Some(EscrowPhase::PrivateCancellation)
        } else if now >= self.public_withdrawal {
            Some(EscrowPhase::PublicWithdrawal)
        } else if now >= self.private_withdrawal {
            Some(EscrowPhase::PrivateWithdrawal)
        } else {
            None
        }
    }

    pub fn remaining_until_public_cancellation(&self, now: u64) -> u64 {
        self.public_cancellation.saturating_sub(now)
    }

    /// Packed uint256 (big-endian) passed to the escrow factory.
    ///
    /// Layout from the least significant slot: deployedAt, then the
    /// withdrawal, public withdrawal, cancellation and public cancellation
    /// offsets, 32 bits each.
    pub fn packed(&self) -> [u8; 32] {
        let slots = [
            self.deployed_at,
            self.private_withdrawal.saturating_sub(self.deployed_at),
            self.public_withdrawal.saturating_sub(self.deployed_at),
            self.private_cancellation.saturating_sub(self.deployed_at),
            self.public_cancellation.saturating_sub(self.deployed_at),
        ];
        let mut word = [0u8; 32];
        for (i, slot) in slots.iter().enumerate() {
            let end = 32 - i * 4;
            word[end - 4..end].copy_from_slice(&(*slot as u32).to_be_bytes());
        }
        word
    }
}

/// Current unix time in seconds.
pub fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
