//! Resolver context
//!
//! Wires the immutable configuration, the order registry, the chain adapters
//! and both services together. There is no global state: everything the API
//! and the monitor need is reachable from one `Resolver` value.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::chains::AdapterSet;
use crate::config::{Config, StorageConfig};
use crate::registry::store::{FileOrderStore, MemoryOrderStore, OrderStore};
use crate::registry::OrderRegistry;
use crate::service::{EscrowOrchestrator, SwapMonitor};

pub struct Resolver {
    pub config: Arc<Config>,
    pub registry: Arc<OrderRegistry>,
    pub adapters: Arc<AdapterSet>,
    pub orchestrator: Arc<EscrowOrchestrator>,
    pub monitor: Arc<SwapMonitor>,
}

impl Resolver {
    /// Assembles a resolver from already-built parts.
    pub fn new(config: Config, registry: OrderRegistry, adapters: AdapterSet) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(registry);
        let adapters = Arc::new(adapters);
        let (monitor, handle) = SwapMonitor::new(config.clone(), registry.clone(), adapters.clone());
        let orchestrator = EscrowOrchestrator::new(
            config.clone(),
            registry.clone(),
            adapters.clone(),
            handle,
        );

        Self {
            config,
            registry,
            adapters,
            orchestrator: Arc::new(orchestrator),
            monitor: Arc::new(monitor),
        }
    }

    /// Opens the configured store and builds the production chain adapters.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn OrderStore> = match &config.storage {
            StorageConfig::Memory => {
                info!("Using in-memory order storage; orders will not survive a restart");
                Arc::new(MemoryOrderStore::new())
            }
            StorageConfig::File { path } => {
                info!("Using file order storage at {}", path);
                Arc::new(
                    FileOrderStore::open(path)
                        .with_context(|| format!("Failed to open order store at {}", path))?,
                )
            }
        };
        let registry = OrderRegistry::open(store).context("Failed to load orders")?;
        let adapters = AdapterSet::from_config(&config)?;
        Ok(Self::new(config, registry, adapters))
    }
}
