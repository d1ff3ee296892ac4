//! Shared test helpers for EVM adapter tests
//!
//! Constants, config builders and JSON-RPC response builders for wiremock.

#![allow(dead_code)]

use chain_clients_common::AddressFormat;
use chain_clients_evm::EvmNetworkConfig;
use serde_json::json;
use std::time::Duration;

// ============================================================================
// CONSTANTS
// ============================================================================

// ------------------------------- ACCOUNTS -------------------------------

/// Resolver account (EVM format, 40 hex characters)
pub const DUMMY_RESOLVER_ADDR: &str = "0x0000000000000000000000000000000000000001";

/// Maker account (EVM format, 40 hex characters)
pub const DUMMY_MAKER_ADDR: &str = "0x0000000000000000000000000000000000000002";

/// Receiver account (EVM format, 40 hex characters)
pub const DUMMY_RECEIVER_ADDR: &str = "0x0000000000000000000000000000000000000003";

// ------------------------- TOKENS AND CONTRACTS -------------------------

/// ERC-20 token contract
pub const DUMMY_TOKEN_ADDR: &str = "0x000000000000000000000000000000000000000a";

/// Escrow factory contract
pub const DUMMY_FACTORY_ADDR: &str = "0x000000000000000000000000000000000000000b";

/// Escrow deployed by the factory
pub const DUMMY_ESCROW_ADDR: &str = "0x000000000000000000000000000000000000000c";

/// Transaction hash returned by eth_sendTransaction
pub const DUMMY_TX_HASH: &str =
    "0x1111111111111111111111111111111111111111111111111111111111111111";

// ------------------------------ SELECTORS -------------------------------

pub const SELECTOR_ALLOWANCE: &str = "dd62ed3e";
pub const SELECTOR_BALANCE_OF: &str = "70a08231";
pub const SELECTOR_TRANSFER: &str = "a9059cbb";
pub const SELECTOR_TRANSFER_FROM: &str = "23b872dd";
pub const SELECTOR_APPROVE: &str = "095ea7b3";
pub const SELECTOR_GET_ESCROW: &str = "f023b811";
pub const SELECTOR_GET_STATE: &str = "1865c57d";
pub const SELECTOR_WITHDRAW: &str = "8e19899e";
pub const SELECTOR_CREATE_ESCROW: &str = "4ac80158";

// ============================================================================
// BUILDERS
// ============================================================================

/// Network config pointing at a mock server.
pub fn create_default_network_config(rpc_url: &str) -> EvmNetworkConfig {
    EvmNetworkConfig {
        network: "testnet".to_string(),
        rpc_url: rpc_url.to_string(),
        signer_url: None,
        resolver_address: DUMMY_RESOLVER_ADDR.to_string(),
        address_format: AddressFormat::Hex,
        receipt_poll_interval: Duration::from_millis(10),
        receipt_timeout: Duration::from_millis(500),
    }
}

/// JSON-RPC success body
pub fn rpc_result(result: serde_json::Value) -> serde_json::Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result })
}

/// JSON-RPC error body
pub fn rpc_error(code: i64, message: &str) -> serde_json::Value {
    json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
}

/// uint256 return value as 0x-hex
pub fn uint_word(value: u128) -> String {
    format!("0x{:064x}", value)
}

/// address return value as 0x-hex word
pub fn address_word(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x"))
}

/// ABI-encoded `string` return value
pub fn string_return(value: &str) -> String {
    let mut out = format!("{:064x}{:064x}", 32, value.len());
    let mut data = hex::encode(value.as_bytes());
    while data.len() % 64 != 0 {
        data.push('0');
    }
    out.push_str(&data);
    format!("0x{}", out)
}

/// Transaction receipt with the given status
pub fn receipt(status: &str) -> serde_json::Value {
    json!({
        "transactionHash": DUMMY_TX_HASH,
        "status": status,
        "blockNumber": "0x10"
    })
}
