//! Resolver Service Library
//!
//! Cross-chain atomic swap resolver. A swap moves a maker's tokens on a
//! source network into resolver custody and locks the counter-value on the
//! destination network, either in an HTLC escrow guarded by a hashlock and a
//! timelock or as a custodial transfer. A background monitor releases locked
//! orders with the secret once they are safe to settle.

pub mod api;
pub mod chains;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod order;
pub mod registry;
pub mod service;
pub mod timelock;

// Re-export commonly used types
pub use chains::AdapterSet;
pub use config::{Config, NetworkConfig, NetworkKind};
pub use context::Resolver;
pub use error::ResolverError;
pub use order::{Order, OrderHash, SwapRequest};
pub use registry::{OrderRecord, OrderRegistry, OrderStatus};
pub use service::{EscrowOrchestrator, SwapMonitor};
