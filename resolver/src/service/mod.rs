//! Resolver services
//!
//! - Escrow orchestrator: sequences source and destination legs of new swaps
//! - Swap monitor: releases locked orders from a deadline-ordered queue

pub mod monitor;
pub mod orchestrator;

pub use monitor::{MonitorHandle, ScheduledCheck, SwapMonitor, TickReport};
pub use orchestrator::{EscrowOrchestrator, SwapReceipt};
