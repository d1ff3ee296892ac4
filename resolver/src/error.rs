//! Resolver error taxonomy
//!
//! Every failure surfaced by the orchestrator, registry or monitor is one of
//! these variants. The API layer maps them onto HTTP status codes.

use chain_clients_common::{AdapterError, Amount};

use crate::registry::OrderStatus;
use crate::registry::store::StorageError;
use crate::timelock::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Malformed or missing request fields; no chain interaction happened
    #[error("{0}")]
    Validation(String),

    /// Maker approval below the making amount; no funds moved
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: Amount, available: Amount },

    /// RPC failure, revert or timeout while locking a leg
    #[error("Chain call failed on {network}: {source}")]
    ChainCall {
        network: String,
        #[source]
        source: AdapterError,
    },

    /// Source funds are in resolver custody but the swap could not proceed
    #[error("Order {order_hash} failed with source funds in resolver custody: {reason}")]
    PartialCustodyFailure { order_hash: String, reason: String },

    #[error("Order {0} not found")]
    NotFound(String),

    #[error("Order {0} already exists")]
    Duplicate(String),

    #[error("Order {order_hash} is {from}, cannot {action}")]
    InvalidTransition {
        order_hash: String,
        from: OrderStatus,
        action: &'static str,
    },

    #[error("Order {0} has no custody to refund")]
    NotRefundable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolverError {
    pub fn chain(network: &str, source: AdapterError) -> Self {
        ResolverError::ChainCall {
            network: network.to_string(),
            source,
        }
    }

    /// True when the underlying chain call hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ResolverError::ChainCall {
                source: AdapterError::Timeout,
                ..
            }
        )
    }
}

impl From<ConfigError> for ResolverError {
    fn from(err: ConfigError) -> Self {
        ResolverError::Config(err.to_string())
    }
}
