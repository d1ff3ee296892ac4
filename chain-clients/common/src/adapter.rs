//! Chain Adapter contract
//!
//! One implementation exists per network kind. Implementations are stateless
//! from the caller's point of view: every call is independent, and a failed
//! call is always reported as an error, never as a simulated success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amount in base units.
pub type Amount = u128;

/// Reference to a locked leg: an escrow contract address or a custody marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegRef(pub String);

/// Transaction hash of a submitted and confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl fmt::Display for LegRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Timelock phase reported by an HTLC escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowPhase {
    /// Only the resolver may withdraw with the secret.
    PrivateWithdrawal,
    /// Anyone holding the secret may withdraw.
    PublicWithdrawal,
    /// Only the payer may cancel and reclaim.
    PrivateCancellation,
    /// Anyone may cancel on behalf of the payer.
    PublicCancellation,
}

impl EscrowPhase {
    /// Parses the state string returned by the escrow contract's `getState()`.
    pub fn from_contract_state(state: &str) -> Option<Self> {
        match state.trim().to_ascii_lowercase().as_str() {
            "private_withdrawal" => Some(Self::PrivateWithdrawal),
            "public_withdrawal" => Some(Self::PublicWithdrawal),
            "private_cancellation" => Some(Self::PrivateCancellation),
            "public_cancellation" => Some(Self::PublicCancellation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivateWithdrawal => "private_withdrawal",
            Self::PublicWithdrawal => "public_withdrawal",
            Self::PrivateCancellation => "private_cancellation",
            Self::PublicCancellation => "public_cancellation",
        }
    }

    /// True once the escrow can no longer be withdrawn with the secret.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::PrivateCancellation | Self::PublicCancellation)
    }
}

/// Parameters for `ChainAdapter::create_escrow`.
#[derive(Debug, Clone)]
pub struct EscrowRequest {
    /// Order identity (32 bytes)
    pub order_hash: [u8; 32],
    /// Token address on the target network
    pub asset: String,
    /// Amount locked, in base units
    pub amount: Amount,
    /// Public hashlock (keccak256 of the secret)
    pub hash_lock: [u8; 32],
    /// Packed timelock word (big-endian uint256)
    pub time_locks: [u8; 32],
    /// Party funding the escrow (the resolver on the destination leg)
    pub payer: String,
    /// Party receiving funds on withdrawal
    pub payee: String,
}

/// Errors returned by chain adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("transaction {tx} reverted")]
    Reverted { tx: String },
    #[error("chain call timed out")]
    Timeout,
    #[error("insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: Amount, available: Amount },
    #[error("operation '{0}' is not supported on this network")]
    Unsupported(&'static str),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no adapter configured for network '{0}'")]
    UnknownNetwork(String),
}

/// Per-network chain capability used by the orchestrator and monitor.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Name of the network this adapter serves.
    fn network(&self) -> &str;

    /// Deploys an HTLC escrow for one order and returns its reference.
    async fn create_escrow(&self, request: &EscrowRequest) -> Result<LegRef, AdapterError>;

    /// Transfers `amount` of `asset` from the resolver to `recipient`.
    async fn direct_transfer(
        &self,
        asset: &str,
        amount: Amount,
        recipient: &str,
    ) -> Result<TxRef, AdapterError>;

    async fn get_allowance(
        &self,
        owner: &str,
        spender: &str,
        asset: &str,
    ) -> Result<Amount, AdapterError>;

    async fn get_balance(&self, owner: &str, asset: &str) -> Result<Amount, AdapterError>;

    /// Moves `amount` of `asset` from `owner` into resolver custody.
    ///
    /// Returns `AdapterError::InsufficientAllowance` without submitting
    /// anything when the owner has not approved enough.
    async fn pull_funds(
        &self,
        owner: &str,
        amount: Amount,
        asset: &str,
    ) -> Result<TxRef, AdapterError>;

    /// Withdraws an escrow by revealing the secret.
    async fn withdraw(&self, leg: &LegRef, secret: &[u8; 32]) -> Result<TxRef, AdapterError>;

    async fn get_state(&self, leg: &LegRef) -> Result<EscrowPhase, AdapterError>;
}
