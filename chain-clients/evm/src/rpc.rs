//! EVM JSON-RPC transport

use anyhow::{Context, Result};
use chain_clients_common::AdapterError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::abi::parse_hex;

/// EVM JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// EVM JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Transaction fields sent with `eth_sendTransaction`
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Subset of a transaction receipt the adapters care about
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// "0x1" on success, "0x0" on revert
    pub status: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        matches!(self.status.as_deref(), Some("0x1") | Some("0x01"))
    }
}

/// JSON-RPC client for one EVM network.
///
/// Reads go to `rpc_url`. Transactions go to `signer_url`, which is either the
/// node itself (unlocked resolver account) or a remote signer exposing
/// `eth_sendTransaction`.
pub struct JsonRpcClient {
    client: Client,
    rpc_url: String,
    signer_url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Creates a new JSON-RPC client
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - Endpoint for reads and receipts
    /// * `signer_url` - Endpoint for `eth_sendTransaction` (defaults to `rpc_url`)
    pub fn new(rpc_url: &str, signer_url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy() // Avoid macOS system-configuration issues in tests
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            signer_url: signer_url.unwrap_or(rpc_url).to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Option<T>, AdapterError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let response: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(format!("{} response: {}", method, e)))?;

        if let Some(error) = response.error {
            return Err(AdapterError::Rpc(format!(
                "{} failed: {} ({})",
                method, error.message, error.code
            )));
        }

        Ok(response.result)
    }

    /// Executes a read-only call against `to` and returns the raw return data.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, AdapterError> {
        let params = vec![
            serde_json::json!({ "to": to, "data": format!("0x{}", hex::encode(data)) }),
            serde_json::json!("latest"),
        ];
        let result: Option<String> = self.request(&self.rpc_url, "eth_call", params).await?;
        let result =
            result.ok_or_else(|| AdapterError::InvalidResponse("eth_call returned no result".into()))?;
        parse_hex(&result)
    }

    /// Submits a transaction through the signer endpoint and returns its hash.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, AdapterError> {
        let params = vec![serde_json::to_value(tx)
            .map_err(|e| AdapterError::InvalidResponse(format!("transaction encoding: {}", e)))?];
        let result: Option<String> = self
            .request(&self.signer_url, "eth_sendTransaction", params)
            .await?;
        result.ok_or_else(|| {
            AdapterError::InvalidResponse("eth_sendTransaction returned no hash".into())
        })
    }

    /// Fetches a receipt; `None` while the transaction is still pending.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, AdapterError> {
        self.request(
            &self.rpc_url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
    }
}

fn transport_error(method: &str, error: reqwest::Error) -> AdapterError {
    if error.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Rpc(format!("Failed to send {} request: {}", method, error))
    }
}
