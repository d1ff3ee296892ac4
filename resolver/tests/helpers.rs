//! Shared test helpers for resolver tests
//!
//! - **Constants**: dummy addresses and token contracts
//! - **Configuration Builders**: a two-network config (contract-based + custodial)
//! - **Request Builders**: default swap requests
//! - **Mock Chain Adapter**: scripted `ChainAdapter` recording every call

#![allow(dead_code)]

use async_trait::async_trait;
use chain_clients_common::{
    AdapterError, Amount, ChainAdapter, EscrowPhase, EscrowRequest, LegRef, TxRef,
};
use resolver::chains::AdapterSet;
use resolver::config::Config;
use resolver::context::Resolver;
use resolver::order::{AmountInput, SwapRequest};
use resolver::registry::OrderRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Contract-based network name
pub const DUMMY_ESCROW_NETWORK: &str = "sepolia";

/// Custodial network name
pub const DUMMY_CUSTODIAL_NETWORK: &str = "monad";

/// Dummy maker address (EVM format, 20 bytes)
pub const DUMMY_MAKER_ADDR: &str = "0x0000000000000000000000000000000000000001";

/// Dummy receiver address (EVM format, 20 bytes)
pub const DUMMY_RECEIVER_ADDR: &str = "0x0000000000000000000000000000000000000002";

/// Dummy resolver account (EVM format, 20 bytes)
pub const DUMMY_RESOLVER_ADDR: &str = "0x0000000000000000000000000000000000000003";

/// Dummy escrow factory (EVM format, 20 bytes)
pub const DUMMY_FACTORY_ADDR: &str = "0x0000000000000000000000000000000000000004";

/// Dummy USDC contract on the contract-based network
pub const DUMMY_USDC_ADDR_ESCROW: &str = "0x0000000000000000000000000000000000000005";

/// Dummy USDC contract on the custodial network
pub const DUMMY_USDC_ADDR_CUSTODIAL: &str = "0x0000000000000000000000000000000000000006";

/// Dummy 18-decimal token on the custodial network
pub const DUMMY_WETH_ADDR_CUSTODIAL: &str = "0x0000000000000000000000000000000000000007";

/// Default swap amount in whole tokens
pub const DUMMY_AMOUNT: &str = "100";

/// 100 USDC in base units (6 decimals)
pub const DUMMY_AMOUNT_BASE_UNITS: Amount = 100_000_000;

/// Default confirmation delay configured by `create_default_config`
pub const DUMMY_CONFIRMATION_SECS: u64 = 10;

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// TOML for the default test configuration.
///
/// In-memory storage, a contract-based `sepolia` and a custodial `monad`,
/// both listing USDC (6 decimals); `monad` also lists an 18-decimal WETH.
pub fn default_config_toml() -> String {
    format!(
        r#"
[api]
host = "127.0.0.1"
port = 3901

[monitor]
period_secs = 30
min_confirmation_secs = {confirmation}
retention_secs = 3600

[chain_calls]
timeout_ms = 2000

[storage]
kind = "memory"

[[network]]
name = "{escrow}"
kind = "contract_based"
chain_id = 11155111
rpc_url = "http://127.0.0.1:8545"
resolver_address = "{resolver}"
escrow_factory_addr = "{factory}"
safety_deposit_wei = "1000"

[[network.asset]]
symbol = "USDC"
address = "{usdc_escrow}"
decimals = 6

[[network]]
name = "{custodial}"
kind = "custodial"
chain_id = 10143
rpc_url = "http://127.0.0.1:8546"
resolver_address = "{resolver}"

[[network.asset]]
symbol = "USDC"
address = "{usdc_custodial}"
decimals = 6

[[network.asset]]
symbol = "WETH"
address = "{weth_custodial}"
decimals = 18
"#,
        confirmation = DUMMY_CONFIRMATION_SECS,
        escrow = DUMMY_ESCROW_NETWORK,
        custodial = DUMMY_CUSTODIAL_NETWORK,
        resolver = DUMMY_RESOLVER_ADDR,
        factory = DUMMY_FACTORY_ADDR,
        usdc_escrow = DUMMY_USDC_ADDR_ESCROW,
        usdc_custodial = DUMMY_USDC_ADDR_CUSTODIAL,
        weth_custodial = DUMMY_WETH_ADDR_CUSTODIAL,
    )
}

/// Create a default valid configuration for testing
pub fn create_default_config() -> Config {
    Config::from_toml_str(&default_config_toml()).unwrap()
}

// ============================================================================
// REQUEST BUILDERS
// ============================================================================

/// Swap of 100 USDC from `from` to `to`.
pub fn create_swap_request(from: &str, to: &str) -> SwapRequest {
    SwapRequest {
        from_network: Some(from.to_string()),
        to_network: Some(to.to_string()),
        from_token: Some("USDC".to_string()),
        to_token: Some("USDC".to_string()),
        amount: Some(AmountInput::Text(DUMMY_AMOUNT.to_string())),
        user_address: Some(DUMMY_MAKER_ADDR.to_string()),
        destination_address: Some(DUMMY_RECEIVER_ADDR.to_string()),
    }
}

/// Create a default swap request (custodial source, contract-based destination)
pub fn create_default_swap_request() -> SwapRequest {
    create_swap_request(DUMMY_CUSTODIAL_NETWORK, DUMMY_ESCROW_NETWORK)
}

// ============================================================================
// MOCK CHAIN ADAPTER
// ============================================================================

/// Scripted chain adapter.
///
/// Succeeds by default with generous allowance and balance. Failures and
/// delays are configured per operation name ("create_escrow", "direct_transfer",
/// "get_allowance", "get_balance", "pull_funds", "withdraw", "get_state").
pub struct MockChainAdapter {
    network: String,
    allowance: Mutex<Amount>,
    balance: Mutex<Amount>,
    state: Mutex<EscrowPhase>,
    failures: Mutex<HashMap<&'static str, AdapterError>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    transfers: Mutex<Vec<(String, Amount, String)>>,
    counter: AtomicUsize,
}

impl MockChainAdapter {
    pub fn new(network: &str) -> Arc<Self> {
        Arc::new(Self {
            network: network.to_string(),
            allowance: Mutex::new(Amount::MAX),
            balance: Mutex::new(Amount::MAX),
            state: Mutex::new(EscrowPhase::PrivateWithdrawal),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            transfers: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(1),
        })
    }

    pub fn set_allowance(&self, allowance: Amount) {
        *self.allowance.lock().unwrap() = allowance;
    }

    pub fn set_balance(&self, balance: Amount) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn set_state(&self, state: EscrowPhase) {
        *self.state.lock().unwrap() = state;
    }

    /// Makes every subsequent `op` call fail with `error`.
    pub fn fail(&self, op: &'static str, error: AdapterError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn clear_failure(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    /// Makes every subsequent `op` call sleep before answering.
    pub fn delay(&self, op: &'static str, duration: Duration) {
        self.delays.lock().unwrap().insert(op, duration);
    }

    /// Number of times `op` was called.
    pub fn calls(&self, op: &'static str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Recorded `direct_transfer` calls as (asset, amount, recipient).
    pub fn transfers(&self) -> Vec<(String, Amount, String)> {
        self.transfers.lock().unwrap().clone()
    }

    async fn enter(&self, op: &'static str) -> Result<usize, AdapterError> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        let delay = self.delays.lock().unwrap().get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().get(op).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(self.counter.fetch_add(1, Ordering::SeqCst)),
        }
    }

    fn tx(n: usize) -> TxRef {
        TxRef(format!("0x{:064x}", n))
    }
}

#[async_trait]
impl ChainAdapter for MockChainAdapter {
    fn network(&self) -> &str {
        &self.network
    }

    async fn create_escrow(&self, _request: &EscrowRequest) -> Result<LegRef, AdapterError> {
        let n = self.enter("create_escrow").await?;
        Ok(LegRef(format!("0x{:040x}", 0xe5c0 + n)))
    }

    async fn direct_transfer(
        &self,
        asset: &str,
        amount: Amount,
        recipient: &str,
    ) -> Result<TxRef, AdapterError> {
        let n = self.enter("direct_transfer").await?;
        self.transfers
            .lock()
            .unwrap()
            .push((asset.to_string(), amount, recipient.to_string()));
        Ok(Self::tx(n))
    }

    async fn get_allowance(
        &self,
        _owner: &str,
        _spender: &str,
        _asset: &str,
    ) -> Result<Amount, AdapterError> {
        self.enter("get_allowance").await?;
        Ok(*self.allowance.lock().unwrap())
    }

    async fn get_balance(&self, _owner: &str, _asset: &str) -> Result<Amount, AdapterError> {
        self.enter("get_balance").await?;
        Ok(*self.balance.lock().unwrap())
    }

    async fn pull_funds(
        &self,
        _owner: &str,
        amount: Amount,
        _asset: &str,
    ) -> Result<TxRef, AdapterError> {
        let n = self.enter("pull_funds").await?;
        let available = *self.allowance.lock().unwrap();
        if available < amount {
            return Err(AdapterError::InsufficientAllowance {
                required: amount,
                available,
            });
        }
        Ok(Self::tx(n))
    }

    async fn withdraw(&self, _leg: &LegRef, _secret: &[u8; 32]) -> Result<TxRef, AdapterError> {
        let n = self.enter("withdraw").await?;
        Ok(Self::tx(n))
    }

    async fn get_state(&self, _leg: &LegRef) -> Result<EscrowPhase, AdapterError> {
        self.enter("get_state").await?;
        Ok(*self.state.lock().unwrap())
    }
}

// ============================================================================
// RESOLVER BUILDERS
// ============================================================================

/// Mocks for both default networks.
pub struct TestChains {
    pub escrow: Arc<MockChainAdapter>,
    pub custodial: Arc<MockChainAdapter>,
}

impl TestChains {
    pub fn new() -> Self {
        Self {
            escrow: MockChainAdapter::new(DUMMY_ESCROW_NETWORK),
            custodial: MockChainAdapter::new(DUMMY_CUSTODIAL_NETWORK),
        }
    }

    pub fn adapter_set(&self, config: &Config) -> AdapterSet {
        let mut set = AdapterSet::new(config.chain_calls.timeout(), config.chain_calls.retry);
        set.insert(DUMMY_ESCROW_NETWORK, self.escrow.clone());
        set.insert(DUMMY_CUSTODIAL_NETWORK, self.custodial.clone());
        set
    }
}

/// Resolver over the default config, an in-memory registry and mock adapters.
pub fn create_test_resolver(config: Config, chains: &TestChains) -> Arc<Resolver> {
    let adapters = chains.adapter_set(&config);
    Arc::new(Resolver::new(config, OrderRegistry::in_memory(), adapters))
}
