//! Escrow factory adapter
//!
//! Adapter for networks with a deployed HTLC escrow factory. The destination
//! leg is an escrow contract created per order; release is `withdraw(secret)`
//! on that contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chain_clients_common::address::ACCOUNT_LEN;
use chain_clients_common::{
    AdapterError, Amount, ChainAdapter, EscrowPhase, EscrowRequest, LegRef, TxRef,
};
use tracing::info;

use crate::abi::{decode_address, decode_string, encode_call, Token};
use crate::chain::{EvmChain, EvmNetworkConfig};

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// `ChainAdapter` for contract-based networks.
pub struct EscrowFactoryClient {
    chain: EvmChain,
    factory: [u8; ACCOUNT_LEN],
    factory_rpc_addr: String,
    safety_deposit_wei: Amount,
}

impl EscrowFactoryClient {
    /// Creates a new escrow factory client
    ///
    /// # Arguments
    ///
    /// * `config` - Network connection settings
    /// * `escrow_factory_addr` - Factory contract address in the network's format
    /// * `safety_deposit_wei` - Native value attached to every `createEscrow`
    pub fn new(
        config: &EvmNetworkConfig,
        escrow_factory_addr: &str,
        safety_deposit_wei: Amount,
    ) -> Result<Self> {
        let chain = EvmChain::new(config)?;
        let factory = config
            .address_format
            .account_bytes(escrow_factory_addr)
            .with_context(|| format!("Invalid escrow factory address for {}", config.network))?;
        let factory_rpc_addr = chain_clients_common::address::to_hex_address(&factory);

        Ok(Self {
            chain,
            factory,
            factory_rpc_addr,
            safety_deposit_wei,
        })
    }

    /// Makes sure the factory may pull `amount` of `asset` from the resolver.
    async fn ensure_factory_allowance(&self, asset: &str, amount: Amount) -> Result<(), AdapterError> {
        let current = self.chain.resolver_allowance(&self.factory, asset).await?;
        if current >= amount {
            return Ok(());
        }
        info!(
            "{}: approving escrow factory for {} of {}",
            self.chain.network(),
            amount,
            asset
        );
        self.chain.approve(&self.factory, amount, asset).await?;
        Ok(())
    }

    /// Looks up the escrow deployed for an order.
    pub async fn escrow_for(&self, order_hash: &[u8; 32]) -> Result<String, AdapterError> {
        let data = encode_call("getEscrow(bytes32)", &[Token::Bytes32(*order_hash)]);
        let result = self.chain.rpc().eth_call(&self.factory_rpc_addr, &data).await?;
        decode_address(&result)
    }
}

#[async_trait]
impl ChainAdapter for EscrowFactoryClient {
    fn network(&self) -> &str {
        self.chain.network()
    }

    async fn create_escrow(&self, request: &EscrowRequest) -> Result<LegRef, AdapterError> {
        self.ensure_factory_allowance(&request.asset, request.amount)
            .await?;

        let data = encode_call(
            "createEscrow(bytes32,address,uint256,bytes32,uint256,address,address)",
            &[
                Token::Bytes32(request.order_hash),
                Token::Address(self.chain.account(&request.asset)?),
                Token::Uint(request.amount),
                Token::Bytes32(request.hash_lock),
                Token::Bytes32(request.time_locks),
                Token::Address(self.chain.account(&request.payer)?),
                Token::Address(self.chain.account(&request.payee)?),
            ],
        );
        let tx = self
            .chain
            .send_and_confirm(&self.factory_rpc_addr, data, Some(self.safety_deposit_wei))
            .await?;

        let escrow = self.escrow_for(&request.order_hash).await?;
        if escrow == ZERO_ADDRESS {
            return Err(AdapterError::InvalidResponse(format!(
                "factory reports no escrow for order 0x{} after tx {}",
                hex::encode(request.order_hash),
                tx
            )));
        }
        info!(
            "{}: escrow {} created for order 0x{} (tx {})",
            self.chain.network(),
            escrow,
            hex::encode(request.order_hash),
            tx
        );
        Ok(LegRef(escrow))
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

    async fn withdraw(&self, leg: &LegRef, secret: &[u8; 32]) -> Result<TxRef, AdapterError> {
        let data = encode_call("withdraw(bytes32)", &[Token::Bytes32(*secret)]);
        self.chain
            .send_and_confirm(&self.chain.rpc_address(&leg.0)?, data, None)
            .await
    }

    async fn get_state(&self, leg: &LegRef) -> Result<EscrowPhase, AdapterError> {
        let data = encode_call("getState()", &[]);
        let result = self
            .chain
            .rpc()
            .eth_call(&self.chain.rpc_address(&leg.0)?, &data)
            .await?;
        let state = decode_string(&result)?;
        EscrowPhase::from_contract_state(&state).ok_or_else(|| {
            AdapterError::InvalidResponse(format!("unknown escrow state '{}'", state))
        })
    }
}
