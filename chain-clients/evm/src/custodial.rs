//! Custodial transfer adapter
//!
//! Adapter for networks without an escrow factory. The resolver holds the
//! destination liquidity itself and pays the receiver with a plain ERC-20
//! transfer; escrow operations are unsupported.

use anyhow::Result;
use async_trait::async_trait;
use chain_clients_common::{
    AdapterError, Amount, ChainAdapter, EscrowPhase, EscrowRequest, LegRef, TxRef,
};

use crate::chain::{EvmChain, EvmNetworkConfig};

/// `ChainAdapter` for custodial networks.
pub struct CustodialTransferClient {
    chain: EvmChain,
}

impl CustodialTransferClient {
    pub fn new(config: &EvmNetworkConfig) -> Result<Self> {
        Ok(Self {
            chain: EvmChain::new(config)?,
        })
    }
}

#[async_trait]
impl ChainAdapter for CustodialTransferClient {
    fn network(&self) -> &str {
        self.chain.network()
    }

    async fn create_escrow(&self, _request: &EscrowRequest) -> Result<LegRef, AdapterError> {
        Err(AdapterError::Unsupported("createEscrow"))
    }

    async fn direct_transfer(
        &self,
        asset: &str,
        amount: Amount,
        recipient: &str,
    ) -> Result<TxRef, AdapterError> {
        self.chain.transfer(asset, amount, recipient).await
    }

    async fn get_allowance(
        &self,
        owner: &str,
        spender: &str,
        asset: &str,
    ) -> Result<Amount, AdapterError> {
        self.chain.allowance(owner, spender, asset).await
    }

    async fn get_balance(&self, owner: &str, asset: &str) -> Result<Amount, AdapterError> {
        self.chain.balance_of(owner, asset).await
    }

    async fn pull_funds(
        &self,
        owner: &str,
        amount: Amount,
        asset: &str,
    ) -> Result<TxRef, AdapterError> {
        self.chain.transfer_from(owner, amount, asset).await
    }

    async fn withdraw(&self, _leg: &LegRef, _secret: &[u8; 32]) -> Result<TxRef, AdapterError> {
        Err(AdapterError::Unsupported("withdraw"))
    }

    async fn get_state(&self, _leg: &LegRef) -> Result<EscrowPhase, AdapterError> {
        Err(AdapterError::Unsupported("getState"))
    }
}
