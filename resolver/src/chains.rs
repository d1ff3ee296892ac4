//! Chain adapter set
//!
//! Holds one `ChainAdapter` per configured network and wraps every call with
//! the configured timeout. Read-only calls are retried when a retry policy is
//! configured; fund-moving calls are issued exactly once.

use anyhow::Context;
use chain_clients_common::{
    AdapterError, Amount, ChainAdapter, EscrowPhase, EscrowRequest, LegRef, TxRef,
};
use chain_clients_evm::{CustodialTransferClient, EscrowFactoryClient};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, NetworkKind, RetryPolicy};

pub struct AdapterSet {
    adapters: HashMap<String, Arc<dyn ChainAdapter>>,
    timeout: Duration,
    retry: Option<RetryPolicy>,
}

impl AdapterSet {
    pub fn new(timeout: Duration, retry: Option<RetryPolicy>) -> Self {
        Self {
            adapters: HashMap::new(),
            timeout,
            retry,
        }
    }

    /// Builds the production adapters for every configured network.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut set = Self::new(config.chain_calls.timeout(), config.chain_calls.retry);
        for network in &config.networks {
            let evm_config = network.evm_config();
            let adapter: Arc<dyn ChainAdapter> = match &network.kind {
                NetworkKind::ContractBased {
                    escrow_factory_addr,
                    ..
                } => Arc::new(
                    EscrowFactoryClient::new(
                        &evm_config,
                        escrow_factory_addr,
                        network.safety_deposit_wei()?,
                    )
                    .with_context(|| format!("Failed to create adapter for {}", network.name))?,
                ),
                NetworkKind::Custodial => Arc::new(
                    CustodialTransferClient::new(&evm_config)
                        .with_context(|| format!("Failed to create adapter for {}", network.name))?,
                ),
            };
            info!(
                "Chain adapter ready: {} ({}, chain ID {})",
                network.name,
                network.kind_name(),
                network.chain_id
            );
            set.insert(&network.name, adapter);
        }
        Ok(set)
    }

    /// Registers the adapter for a network, replacing any existing one.
    pub fn insert(&mut self, network: &str, adapter: Arc<dyn ChainAdapter>) {
        self.adapters.insert(network.to_ascii_lowercase(), adapter);
    }

    pub fn get(&self, network: &str) -> Result<Arc<dyn ChainAdapter>, AdapterError> {
        self.adapters
            .get(&network.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| AdapterError::UnknownNetwork(network.to_string()))
    }

    /// Runs one adapter call under the timeout.
    async fn bounded<T, Fut>(&self, fut: Fut) -> Result<T, AdapterError>
    where
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout),
        }
    }

    /// Runs a read-only call, retrying transport failures per the retry policy.
    async fn read<T, F, Fut>(&self, network: &str, op: &'static str, call: F) -> Result<T, AdapterError>
    where
        F: Fn(Arc<dyn ChainAdapter>) -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let adapter = self.get(network)?;
        let attempts = self.retry.map(|r| r.max_attempts.max(1)).unwrap_or(1);
        let mut attempt = 1;
        loop {
            match self.bounded(call(adapter.clone())).await {
                Err(e @ (AdapterError::Timeout | AdapterError::Rpc(_))) if attempt < attempts => {
                    warn!(
                        "{} on {} failed (attempt {}/{}): {}",
                        op, network, attempt, attempts, e
                    );
                    if let Some(retry) = self.retry {
                        tokio::time::sleep(Duration::from_millis(retry.backoff_ms)).await;
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn get_allowance(
        &self,
        network: &str,
        owner: &str,
        spender: &str,
        asset: &str,
    ) -> Result<Amount, AdapterError> {
        self.read(network, "getAllowance", |a| async move {
            a.get_allowance(owner, spender, asset).await
        })
        .await
    }

    pub async fn get_balance(&self, network: &str, owner: &str, asset: &str) -> Result<Amount, AdapterError> {
        self.read(network, "getBalance", |a| async move {
            a.get_balance(owner, asset).await
        })
        .await
    }

    pub async fn get_state(&self, network: &str, leg: &LegRef) -> Result<EscrowPhase, AdapterError> {
        self.read(network, "getState", |a| async move { a.get_state(leg).await })
            .await
    }

    pub async fn pull_funds(
        &self,
        network: &str,
        owner: &str,
        amount: Amount,
        asset: &str,
    ) -> Result<TxRef, AdapterError> {
        let adapter = self.get(network)?;
        self.bounded(adapter.pull_funds(owner, amount, asset)).await
    }

    pub async fn create_escrow(&self, network: &str, request: &EscrowRequest) -> Result<LegRef, AdapterError> {
        let adapter = self.get(network)?;
        self.bounded(adapter.create_escrow(request)).await
    }

    pub async fn direct_transfer(
        &self,
        network: &str,
        asset: &str,
        amount: Amount,
        recipient: &str,
    ) -> Result<TxRef, AdapterError> {
        let adapter = self.get(network)?;
        self.bounded(adapter.direct_transfer(asset, amount, recipient))
            .await
    }

    pub async fn withdraw(&self, network: &str, leg: &LegRef, secret: &[u8; 32]) -> Result<TxRef, AdapterError> {
        let adapter = self.get(network)?;
        self.bounded(adapter.withdraw(leg, secret)).await
    }
}
