//! Canonical address encodings
//!
//! Networks display addresses either as 0x-hex (EVM) or Base58Check
//! (Tron-style). Order hashing and ABI encoding work on bytes, so every
//! address is decoded here before use.

use serde::{Deserialize, Serialize};

/// Length of an account identifier in ABI-encoded calldata.
pub const ACCOUNT_LEN: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    /// 0x-prefixed 20-byte hex
    #[default]
    Hex,
    /// Base58Check with a one-byte network prefix followed by 20 account bytes
    Base58Check,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid hex address '{0}'")]
    InvalidHex(String),
    #[error("invalid base58check address '{0}'")]
    InvalidBase58(String),
    #[error("address '{address}' decodes to {len} bytes, expected {expected}")]
    Length {
        address: String,
        len: usize,
        expected: usize,
    },
}

impl AddressFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFormat::Hex => "hex",
            AddressFormat::Base58Check => "base58_check",
        }
    }

    /// Decodes an address into the bytes used for order hashing.
    ///
    /// Hex addresses yield 20 bytes; Base58Check addresses yield the
    /// checksum-verified payload including the network prefix byte.
    pub fn canonical_bytes(&self, address: &str) -> Result<Vec<u8>, AddressError> {
        match self {
            AddressFormat::Hex => {
                let stripped = address
                    .strip_prefix("0x")
                    .or_else(|| address.strip_prefix("0X"))
                    .ok_or_else(|| AddressError::InvalidHex(address.to_string()))?;
                let bytes = hex::decode(stripped)
                    .map_err(|_| AddressError::InvalidHex(address.to_string()))?;
                if bytes.len() != ACCOUNT_LEN {
                    return Err(AddressError::Length {
                        address: address.to_string(),
                        len: bytes.len(),
                        expected: ACCOUNT_LEN,
                    });
                }
                Ok(bytes)
            }
            AddressFormat::Base58Check => {
                let bytes = bs58::decode(address)
                    .with_check(None)
                    .into_vec()
                    .map_err(|_| AddressError::InvalidBase58(address.to_string()))?;
                if bytes.len() != ACCOUNT_LEN + 1 {
                    return Err(AddressError::Length {
                        address: address.to_string(),
                        len: bytes.len(),
                        expected: ACCOUNT_LEN + 1,
                    });
                }
                Ok(bytes)
            }
        }
    }

    /// Returns the 20-byte account identifier used in ABI calldata.
    pub fn account_bytes(&self, address: &str) -> Result<[u8; ACCOUNT_LEN], AddressError> {
        let bytes = self.canonical_bytes(address)?;
        let mut account = [0u8; ACCOUNT_LEN];
        account.copy_from_slice(&bytes[bytes.len() - ACCOUNT_LEN..]);
        Ok(account)
    }

    pub fn validate(&self, address: &str) -> Result<(), AddressError> {
        self.canonical_bytes(address).map(|_| ())
    }
}

/// Formats account bytes as a lowercase 0x-hex address.
pub fn to_hex_address(account: &[u8; ACCOUNT_LEN]) -> String {
    format!("0x{}", hex::encode(account))
}
