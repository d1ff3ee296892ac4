//! Configuration Management Module
//!
//! Loads the resolver configuration from TOML once at startup. The resulting
//! `Config` is validated and then shared immutably (`Arc<Config>`) by every
//! component; nothing mutates it for the lifetime of the process.

use anyhow::Context;
use chain_clients_common::AddressFormat;
use chain_clients_evm::EvmNetworkConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::timelock::{compute_time_lock, TimeLockDurations};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/resolver.toml";

/// Environment variable overriding the configuration path.
pub const CONFIG_PATH_ENV: &str = "RESOLVER_CONFIG_PATH";

/// Largest token decimals accepted; 10^36 still fits comfortably in u128.
pub const MAX_DECIMALS: u8 = 36;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Phase durations applied to every order
    #[serde(default)]
    pub timelock: TimeLockDurations,
    /// Monitor loop settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Timeout and retry policy for chain adapter calls
    #[serde(default)]
    pub chain_calls: ChainCallConfig,
    /// Order persistence backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Supported networks (use [[network]] in TOML)
    #[serde(rename = "network", default)]
    pub networks: Vec<NetworkConfig>,
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Allowed CORS origins ("*" allows any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Monitor loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Maximum time between queue checks
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
    /// Minimum age of an order before release is attempted
    #[serde(default = "default_min_confirmation_secs")]
    pub min_confirmation_secs: u64,
    /// Terminal orders without custody are evicted after this long
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
            min_confirmation_secs: default_min_confirmation_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

/// Chain adapter call policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainCallConfig {
    /// Upper bound on a single adapter call
    #[serde(default = "default_chain_call_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry policy for read-only calls; no retries when absent
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

impl Default for ChainCallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_chain_call_timeout_ms(),
            retry: None,
        }
    }
}

impl ChainCallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Order persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Orders are lost on restart (tests and local demos)
    Memory,
    /// One JSON document per order under `path`
    File { path: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            path: "data/orders".to_string(),
        }
    }
}

/// Configuration for one supported network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name used in swap requests (e.g. "sepolia")
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Endpoint accepting eth_sendTransaction for the resolver account (defaults to rpc_url)
    #[serde(default)]
    pub signer_url: Option<String>,
    /// Resolver account on this network
    pub resolver_address: String,
    /// Address encoding used on this network
    #[serde(default)]
    pub address_format: AddressFormat,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    /// Supported tokens (use [[network.asset]] in TOML)
    #[serde(rename = "asset", default)]
    pub assets: Vec<AssetConfig>,
    /// How the destination leg is realized on this network
    #[serde(flatten)]
    pub kind: NetworkKind,
}

/// Network kind. Selects the chain adapter implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkKind {
    /// HTLC escrow factory deployed; legs are escrow contracts
    ContractBased {
        escrow_factory_addr: String,
        /// Native value attached to createEscrow, in wei (decimal string)
        #[serde(default = "default_safety_deposit")]
        safety_deposit_wei: String,
    },
    /// No escrow factory; the resolver pays out by direct transfer
    Custodial,
}

/// Token supported on a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Symbol used in swap requests (matched case-insensitively)
    pub symbol: String,
    /// Token contract address in the network's format
    pub address: String,
    pub decimals: u8,
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    3001
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_period_secs() -> u64 {
    30
}

fn default_min_confirmation_secs() -> u64 {
    10
}

fn default_retention_secs() -> u64 {
    7 * 24 * 3600
}

fn default_chain_call_timeout_ms() -> u64 {
    30_000
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

fn default_receipt_timeout_ms() -> u64 {
    25_000
}

fn default_safety_deposit() -> String {
    "0".to_string()
}

// ============================================================================
// ACCESSORS
// ============================================================================

impl Config {
    /// Looks up a network by name (case-insensitive).
    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }
}

impl NetworkConfig {
    /// Looks up a token by symbol (case-insensitive).
    pub fn asset(&self, symbol: &str) -> Option<&AssetConfig> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn is_contract_based(&self) -> bool {
        matches!(self.kind, NetworkKind::ContractBased { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NetworkKind::ContractBased { .. } => "contract_based",
            NetworkKind::Custodial => "custodial",
        }
    }

    /// Safety deposit in wei; zero for custodial networks.
    pub fn safety_deposit_wei(&self) -> anyhow::Result<u128> {
        match &self.kind {
            NetworkKind::ContractBased {
                safety_deposit_wei, ..
            } => safety_deposit_wei.parse::<u128>().with_context(|| {
                format!(
                    "Invalid safety_deposit_wei '{}' for network {}",
                    safety_deposit_wei, self.name
                )
            }),
            NetworkKind::Custodial => Ok(0),
        }
    }

    /// Connection settings for the EVM chain adapters.
    pub fn evm_config(&self) -> EvmNetworkConfig {
        EvmNetworkConfig {
            network: self.name.clone(),
            rpc_url: self.rpc_url.clone(),
            signer_url: self.signer_url.clone(),
            resolver_address: self.resolver_address.clone(),
            address_format: self.address_format,
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            receipt_timeout: Duration::from_millis(self.receipt_timeout_ms),
        }
    }
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// The path is, in order: the given path, `RESOLVER_CONFIG_PATH`, or
    /// `config/resolver.toml`. A missing file is an error asking the user to
    /// copy the template.
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/resolver.template.toml config/resolver.toml\n\
                Then edit config/resolver.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid configuration in {}", config_path))
    }

    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks:
    /// - At least two networks, with unique names and chain IDs
    /// - Every address decodes under its network's format
    /// - Every network has at least one asset, with unique symbols and sane decimals
    /// - Timelock durations are strictly increasing
    /// - Monitor period and chain call timeout are non-zero
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.networks.len() < 2 {
            anyhow::bail!("Configuration error: At least two [[network]] entries must be configured");
        }

        let mut names = HashSet::new();
        let mut chain_ids = HashSet::new();
        for network in &self.networks {
            if !names.insert(network.name.to_ascii_lowercase()) {
                anyhow::bail!(
                    "Configuration error: Duplicate network name '{}'",
                    network.name
                );
            }
            if !chain_ids.insert(network.chain_id) {
                anyhow::bail!(
                    "Configuration error: Networks share chain ID {}",
                    network.chain_id
                );
            }
            validate_network(network)?;
        }

        // Build a sample timelock so bad durations fail here, not per order
        compute_time_lock(0, &self.timelock)
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

        if self.monitor.period_secs == 0 {
            anyhow::bail!("Configuration error: monitor.period_secs must be greater than 0");
        }
        if self.chain_calls.timeout_ms == 0 {
            anyhow::bail!("Configuration error: chain_calls.timeout_ms must be greater than 0");
        }
        if let Some(retry) = &self.chain_calls.retry {
            if retry.max_attempts == 0 {
                anyhow::bail!("Configuration error: chain_calls.retry.max_attempts must be at least 1");
            }
        }
        if let StorageConfig::File { path } = &self.storage {
            if path.trim().is_empty() {
                anyhow::bail!("Configuration error: storage.path must not be empty");
            }
        }

        Ok(())
    }
}

fn validate_network(network: &NetworkConfig) -> anyhow::Result<()> {
    let name = &network.name;
    if name.trim().is_empty() {
        anyhow::bail!("Configuration error: Network name must not be empty");
    }
    if network.rpc_url.trim().is_empty() {
        anyhow::bail!("Configuration error: Network {} has an empty rpc_url", name);
    }

    let format = network.address_format;
    format.validate(&network.resolver_address).map_err(|e| {
        anyhow::anyhow!("Configuration error: Network {} resolver_address: {}", name, e)
    })?;

    if let NetworkKind::ContractBased {
        escrow_factory_addr,
        ..
    } = &network.kind
    {
        format.validate(escrow_factory_addr).map_err(|e| {
            anyhow::anyhow!("Configuration error: Network {} escrow_factory_addr: {}", name, e)
        })?;
    }
    network
        .safety_deposit_wei()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if network.assets.is_empty() {
        anyhow::bail!("Configuration error: Network {} has no [[network.asset]] entries", name);
    }
    let mut symbols = HashSet::new();
    for asset in &network.assets {
        if !symbols.insert(asset.symbol.to_ascii_uppercase()) {
            anyhow::bail!(
                "Configuration error: Network {} lists asset {} twice",
                name,
                asset.symbol
            );
        }
        if asset.decimals > MAX_DECIMALS {
            anyhow::bail!(
                "Configuration error: Asset {} on {} has {} decimals (max {})",
                asset.symbol,
                name,
                asset.decimals,
                MAX_DECIMALS
            );
        }
        format.validate(&asset.address).map_err(|e| {
            anyhow::anyhow!("Configuration error: Asset {} on {}: {}", asset.symbol, name, e)
        })?;
    }

    Ok(())
}
