//! Minimal Solidity ABI encoding
//!
//! Only static argument types are needed for the escrow factory and ERC-20
//! calls; the one dynamic return value (`getState() -> string`) is decoded
//! by `decode_string`.

use chain_clients_common::AdapterError;
use sha3::{Digest, Keccak256};

/// ABI word size in bytes
pub const WORD: usize = 32;

/// Static ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Uint(u128),
    Bytes32([u8; 32]),
}

impl Token {
    fn to_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Token::Address(addr) => word[12..].copy_from_slice(addr),
            Token::Uint(value) => word[16..].copy_from_slice(&value.to_be_bytes()),
            Token::Bytes32(bytes) => word.copy_from_slice(bytes),
        }
        word
    }
}

/// Returns the 4-byte function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let hash = hasher.finalize();
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encodes a call: selector followed by one word per argument.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&arg.to_word());
    }
    data
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8], AdapterError> {
    index
        .checked_mul(WORD)
        .and_then(|start| Some(start..start.checked_add(WORD)?))
        .and_then(|range| data.get(range))
        .ok_or_else(|| {
            AdapterError::InvalidResponse(format!(
                "return data too short: {} bytes, need word {}",
                data.len(),
                index
            ))
        })
}

/// Decodes a word used as an offset or length into the return data.
fn decode_usize(word: &[u8]) -> Result<usize, AdapterError> {
    let value = decode_uint(word)?;
    usize::try_from(value)
        .map_err(|_| AdapterError::InvalidResponse(format!("offset {} out of range", value)))
}

/// Decodes a uint256 return value, saturating at `u128::MAX`.
///
/// Unlimited ERC-20 approvals are usually `type(uint256).max`, which does
/// not fit in 128 bits.
pub fn decode_uint(data: &[u8]) -> Result<u128, AdapterError> {
    let word = word_at(data, 0)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Ok(u128::MAX);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decodes an address return value as lowercase 0x-hex.
pub fn decode_address(data: &[u8]) -> Result<String, AdapterError> {
    let word = word_at(data, 0)?;
    Ok(format!("0x{}", hex::encode(&word[12..])))
}

/// Decodes a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, AdapterError> {
    let offset = decode_usize(word_at(data, 0)?)?;
    if offset % WORD != 0 {
        return Err(AdapterError::InvalidResponse(format!(
            "unaligned string offset {}",
            offset
        )));
    }
    let len = decode_usize(word_at(data, offset / WORD)?)?;
    let bytes = offset
        .checked_add(WORD)
        .and_then(|start| Some(start..start.checked_add(len)?))
        .and_then(|range| data.get(range))
        .ok_or_else(|| {
            AdapterError::InvalidResponse(format!("string length {} exceeds return data", len))
        })?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| AdapterError::InvalidResponse(format!("string is not UTF-8: {}", e)))
}

/// Parses 0x-prefixed hex into bytes.
pub fn parse_hex(value: &str) -> Result<Vec<u8>, AdapterError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped)
        .map_err(|e| AdapterError::InvalidResponse(format!("invalid hex '{}': {}", value, e)))
}
