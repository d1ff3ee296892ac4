//! REST API Server Module
//!
//! Thin HTTP surface over the orchestrator and registry:
//! - POST /swap: submit a swap and run both legs
//! - GET /order/:orderHash: order projection
//! - GET /orders: order summaries
//! - POST /order/:orderHash/refund: compensating refund after a partial custody failure
//! - GET /health, GET /info

// Shared response types, filters, rejection handling and the server itself
mod generic;

// Order and swap handlers
mod orders;

pub use generic::{ApiResponse, ApiServer};
pub use orders::{InfoResponse, OrderSummary, OrderView, OrdersResponse, SwapResponse};
