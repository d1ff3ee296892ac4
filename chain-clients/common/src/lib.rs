//! Shared chain client contract for the swap resolver
//!
//! Defines the per-network `ChainAdapter` capability consumed by the escrow
//! orchestrator and monitor, plus canonical address codecs used for order
//! hashing and ABI encoding.

pub mod adapter;
pub mod address;

pub use adapter::{AdapterError, Amount, ChainAdapter, EscrowPhase, EscrowRequest, LegRef, TxRef};
pub use address::{AddressError, AddressFormat};
