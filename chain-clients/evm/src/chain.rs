//! Shared EVM account operations
//!
//! Wraps the JSON-RPC transport with the resolver's account and the ERC-20
//! calls both adapter kinds need.

use anyhow::{Context, Result};
use chain_clients_common::address::{to_hex_address, ACCOUNT_LEN};
use chain_clients_common::{AdapterError, AddressFormat, Amount, TxRef};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::abi::{decode_uint, encode_call, Token};
use crate::rpc::{JsonRpcClient, TransactionRequest};

/// Connection settings for one EVM-compatible network.
#[derive(Debug, Clone)]
pub struct EvmNetworkConfig {
    /// Network name used in logs and adapter lookup
    pub network: String,
    /// RPC endpoint for reads and receipts
    pub rpc_url: String,
    /// Endpoint accepting `eth_sendTransaction` for the resolver account
    pub signer_url: Option<String>,
    /// Resolver account on this network
    pub resolver_address: String,
    /// Display encoding of addresses on this network
    pub address_format: AddressFormat,
    /// Delay between receipt polls
    pub receipt_poll_interval: Duration,
    /// Give up waiting for a receipt after this long
    pub receipt_timeout: Duration,
}

/// Resolver account on one EVM network.
pub struct EvmChain {
    rpc: JsonRpcClient,
    network: String,
    format: AddressFormat,
    resolver: [u8; ACCOUNT_LEN],
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl EvmChain {
    pub fn new(config: &EvmNetworkConfig) -> Result<Self> {
        let rpc = JsonRpcClient::new(&config.rpc_url, config.signer_url.as_deref())?;
        let resolver = config
            .address_format
            .account_bytes(&config.resolver_address)
            .with_context(|| format!("Invalid resolver address for {}", config.network))?;

        Ok(Self {
            rpc,
            network: config.network.clone(),
            format: config.address_format,
            resolver,
            receipt_poll_interval: config.receipt_poll_interval,
            receipt_timeout: config.receipt_timeout,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn rpc(&self) -> &JsonRpcClient {
        &self.rpc
    }

    pub fn resolver_account(&self) -> [u8; ACCOUNT_LEN] {
        self.resolver
    }

    /// Decodes a network address into its ABI account bytes.
    pub fn account(&self, address: &str) -> Result<[u8; ACCOUNT_LEN], AdapterError> {
        self.format
            .account_bytes(address)
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))
    }

    /// Address as the JSON-RPC `to`/`from` field expects it.
    pub fn rpc_address(&self, address: &str) -> Result<String, AdapterError> {
        Ok(to_hex_address(&self.account(address)?))
    }

    pub async fn allowance(
        &self,
        owner: &str,
        spender: &str,
        asset: &str,
    ) -> Result<Amount, AdapterError> {
        self.allowance_of(self.account(owner)?, self.account(spender)?, asset)
            .await
    }

    async fn allowance_of(
        &self,
        owner: [u8; ACCOUNT_LEN],
        spender: [u8; ACCOUNT_LEN],
        asset: &str,
    ) -> Result<Amount, AdapterError> {
        let data = encode_call(
            "allowance(address,address)",
            &[Token::Address(owner), Token::Address(spender)],
        );
        let result = self.rpc.eth_call(&self.rpc_address(asset)?, &data).await?;
        decode_uint(&result)
    }

    /// ERC-20 allowance granted by the resolver itself (e.g. to an escrow factory).
    pub async fn resolver_allowance(
        &self,
        spender: &[u8; ACCOUNT_LEN],
        asset: &str,
    ) -> Result<Amount, AdapterError> {
        self.allowance_of(self.resolver, *spender, asset).await
    }

    pub async fn balance_of(&self, owner: &str, asset: &str) -> Result<Amount, AdapterError> {
        let data = encode_call("balanceOf(address)", &[Token::Address(self.account(owner)?)]);
        let result = self.rpc.eth_call(&self.rpc_address(asset)?, &data).await?;
        decode_uint(&result)
    }

    pub async fn transfer(
        &self,
        asset: &str,
        amount: Amount,
        recipient: &str,
    ) -> Result<TxRef, AdapterError> {
        let data = encode_call(
            "transfer(address,uint256)",
            &[Token::Address(self.account(recipient)?), Token::Uint(amount)],
        );
        self.send_and_confirm(&self.rpc_address(asset)?, data, None).await
    }

    /// Pulls `amount` from `owner` into the resolver account.
    ///
    /// The allowance is checked first so a short approval never produces a
    /// reverted transaction.
    pub async fn transfer_from(
        &self,
        owner: &str,
        amount: Amount,
        asset: &str,
    ) -> Result<TxRef, AdapterError> {
        let owner_account = self.account(owner)?;
        let available = self.allowance_of(owner_account, self.resolver, asset).await?;
        if available < amount {
            return Err(AdapterError::InsufficientAllowance {
                required: amount,
                available,
            });
        }

        let data = encode_call(
            "transferFrom(address,address,uint256)",
            &[
                Token::Address(owner_account),
                Token::Address(self.resolver),
                Token::Uint(amount),
            ],
        );
        self.send_and_confirm(&self.rpc_address(asset)?, data, None).await
    }

    pub async fn approve(
        &self,
        spender: &[u8; ACCOUNT_LEN],
        amount: Amount,
        asset: &str,
    ) -> Result<TxRef, AdapterError> {
        let data = encode_call(
            "approve(address,uint256)",
            &[Token::Address(*spender), Token::Uint(amount)],
        );
        self.send_and_confirm(&self.rpc_address(asset)?, data, None).await
    }

    /// Sends a transaction from the resolver account and waits for its receipt.
    ///
    /// A mined receipt with status 0 is `AdapterError::Reverted`.
    pub async fn send_and_confirm(
        &self,
        to: &str,
        data: Vec<u8>,
        value: Option<Amount>,
    ) -> Result<TxRef, AdapterError> {
        let tx = TransactionRequest {
            from: to_hex_address(&self.resolver),
            to: to.to_string(),
            data: format!("0x{}", hex::encode(&data)),
            value: value.map(|v| format!("0x{:x}", v)),
        };
        let tx_hash = self.rpc.send_transaction(&tx).await?;
        debug!("{}: submitted transaction {} to {}", self.network, tx_hash, to);

        let started = Instant::now();
        loop {
            if let Some(receipt) = self.rpc.get_transaction_receipt(&tx_hash).await? {
                if !receipt.succeeded() {
                    return Err(AdapterError::Reverted {
                        tx: receipt.transaction_hash,
                    });
                }
                info!(
                    "{}: transaction {} confirmed in block {}",
                    self.network,
                    tx_hash,
                    receipt.block_number.as_deref().unwrap_or("?")
                );
                return Ok(TxRef(tx_hash));
            }
            if started.elapsed() >= self.receipt_timeout {
                return Err(AdapterError::Timeout);
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}
