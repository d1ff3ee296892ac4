//! EVM chain adapters for the swap resolver
//!
//! Two `ChainAdapter` implementations share one JSON-RPC transport:
//! - `EscrowFactoryClient` for networks with a deployed HTLC escrow factory
//! - `CustodialTransferClient` for networks where the resolver pays out by
//!   plain ERC-20 transfer

pub mod abi;
pub mod chain;
pub mod custodial;
pub mod escrow;
pub mod rpc;

pub use chain::{EvmChain, EvmNetworkConfig};
pub use custodial::CustodialTransferClient;
pub use escrow::EscrowFactoryClient;
pub use rpc::JsonRpcClient;
