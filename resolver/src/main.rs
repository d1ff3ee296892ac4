//! Resolver Service
//!
//! Runs the REST API and the release monitor until shutdown.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin resolver -- --config config/resolver.toml
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! RESOLVER_CONFIG_PATH=config/resolver.toml cargo run --bin resolver
//! ```

use anyhow::Result;
use clap::Parser;
use resolver::{api::ApiServer, config::CONFIG_PATH_ENV, Config, Resolver};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "resolver")]
#[command(about = "Cross-chain atomic swap resolver - locks, monitors and releases swaps")]
struct Args {
    /// Path to resolver configuration file (default: config/resolver.toml or RESOLVER_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first (before initializing logging)
    let args = Args::parse();

    // Initialize structured logging
    tracing_subscriber::fmt::init();

    info!("Starting Resolver Service");

    // Priority: CLI arg > env var > default
    let config = if let Some(path) = args.config {
        info!("Loading configuration from: {}", path);
        Config::load_from_path(Some(&path))?
    } else {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            info!("Loading configuration from {}: {}", CONFIG_PATH_ENV, path);
        } else {
            info!("Loading configuration from default location");
        }
        Config::load()?
    };

    info!("Configuration loaded successfully");
    for network in &config.networks {
        info!(
            "Network {} ({}, chain ID {}), resolver {}",
            network.name,
            network.kind_name(),
            network.chain_id,
            network.resolver_address
        );
    }

    let resolver = Arc::new(Resolver::from_config(config)?);

    // Re-queue orders that were locked before the last shutdown
    let seeded = resolver.monitor.seed_from_registry().await;
    info!("Scheduled {} locked orders from storage", seeded);

    let api_server = ApiServer::new(resolver.clone());
    let monitor = resolver.monitor.clone();

    tokio::select! {
        result = monitor.run() => {
            if let Err(e) = result {
                error!("Swap monitor error: {}", e);
            }
        }

        result = api_server.run() => {
            if let Err(e) = result {
                error!("API server error: {}", e);
            }
        }

        // Graceful shutdown on Ctrl+C
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping services...");
        }
    }

    info!("Resolver service stopped");
    Ok(())
}
