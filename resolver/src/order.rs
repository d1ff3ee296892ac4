//! Order intake
//!
//! Turns a swap request into an immutable `Order`: validates fields against
//! the configured networks and tokens, scales decimal amounts into base
//! units, and derives the order hash from a canonical byte encoding.

use chain_clients_common::Amount;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{Config, NetworkConfig};
use crate::crypto::{hex32, keccak256};
use crate::error::ResolverError;

/// Domain separator for order hashing.
const ORDER_HASH_DOMAIN: &[u8] = b"swap-resolver/order/v1";

// ============================================================================
// ORDER HASH
// ============================================================================

/// Order identity: keccak256 of the canonical order encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderHash(#[serde(with = "hex32")] pub [u8; 32]);

impl OrderHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderHash({})", self)
    }
}

impl FromStr for OrderHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex32::parse(s).map(OrderHash)
    }
}

// ============================================================================
// REQUEST AND ORDER
// ============================================================================

/// Amount as sent by clients: either a JSON string or a JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for AmountInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountInput::Text(s) => f.write_str(s),
            AmountInput::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Swap request as received by `POST /swap`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub from_network: Option<String>,
    pub to_network: Option<String>,
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    pub amount: Option<AmountInput>,
    pub user_address: Option<String>,
    /// Receiver on the destination network; defaults to `user_address`
    pub destination_address: Option<String>,
}

/// Immutable swap intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_hash: OrderHash,
    pub maker: String,
    pub receiver: String,
    pub source_network: String,
    pub destination_network: String,
    /// Token symbol on the source network
    pub source_token: String,
    /// Token symbol on the destination network
    pub destination_token: String,
    /// Token contract on the source network
    pub source_asset: String,
    /// Token contract on the destination network
    pub destination_asset: String,
    #[serde(with = "amount_string")]
    pub making_amount: Amount,
    #[serde(with = "amount_string")]
    pub taking_amount: Amount,
    #[serde(with = "hex32")]
    pub salt: [u8; 32],
}

/// Serde helper: u128 amounts as decimal strings (JSON numbers lose precision).
pub mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// INTAKE
// ============================================================================

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ResolverError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ResolverError::Validation(format!(
            "Missing required field: {}",
            field
        ))),
    }
}

fn lookup_network<'a>(config: &'a Config, name: &str) -> Result<&'a NetworkConfig, ResolverError> {
    config.network(name).ok_or_else(|| {
        ResolverError::Validation(format!("Unsupported network: {}", name))
    })
}

/// Builds an order from a request with a fresh random salt.
pub fn build_order(config: &Config, request: &SwapRequest) -> Result<Order, ResolverError> {
    let mut salt = [0u8; 32];
    OsRng.fill_bytes(&mut salt);
    build_order_with_salt(config, request, salt)
}

/// Builds an order from a request with the given salt.
///
/// All validation happens here, before any chain interaction.
pub fn build_order_with_salt(
    config: &Config,
    request: &SwapRequest,
    salt: [u8; 32],
) -> Result<Order, ResolverError> {
    let from_network = required(&request.from_network, "fromNetwork")?;
    let to_network = required(&request.to_network, "toNetwork")?;
    let from_token = required(&request.from_token, "fromToken")?;
    let to_token = required(&request.to_token, "toToken")?;
    let amount = request
        .amount
        .as_ref()
        .map(|a| a.to_string())
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ResolverError::Validation("Missing required field: amount".to_string()))?;
    let user_address = required(&request.user_address, "userAddress")?;

    let source = lookup_network(config, from_network)?;
    let destination = lookup_network(config, to_network)?;
    if source.name == destination.name {
        return Err(ResolverError::Validation(
            "Source and destination networks must be different".to_string(),
        ));
    }

    let source_asset = source.asset(from_token).ok_or_else(|| {
        ResolverError::Validation(format!(
            "Unsupported token {} on {}",
            from_token, source.name
        ))
    })?;
    let destination_asset = destination.asset(to_token).ok_or_else(|| {
        ResolverError::Validation(format!(
            "Unsupported token {} on {}",
            to_token, destination.name
        ))
    })?;

    let receiver = match request.destination_address.as_deref().map(str::trim) {
        Some(addr) if !addr.is_empty() => addr,
        _ => user_address,
    };
    let maker_bytes = source.address_format.canonical_bytes(user_address).map_err(|e| {
        ResolverError::Validation(format!("Invalid userAddress for {}: {}", source.name, e))
    })?;
    let receiver_bytes = destination
        .address_format
        .canonical_bytes(receiver)
        .map_err(|e| {
            ResolverError::Validation(format!(
                "Invalid destinationAddress for {}: {}",
                destination.name, e
            ))
        })?;

    let making_amount = parse_amount(&amount, source_asset.decimals)
        .map_err(|e| ResolverError::Validation(format!("Invalid amount: {}", e)))?;
    let taking_amount = rescale(making_amount, source_asset.decimals, destination_asset.decimals)
        .map_err(|e| ResolverError::Validation(format!("Invalid amount: {}", e)))?;

    // Config validation guarantees these decode
    let source_asset_bytes = source
        .address_format
        .canonical_bytes(&source_asset.address)
        .map_err(|e| ResolverError::Config(e.to_string()))?;
    let destination_asset_bytes = destination
        .address_format
        .canonical_bytes(&destination_asset.address)
        .map_err(|e| ResolverError::Config(e.to_string()))?;

    let order_hash = compute_order_hash(&OrderHashInput {
        source_network: &source.name,
        source_chain_id: source.chain_id,
        maker: &maker_bytes,
        source_asset: &source_asset_bytes,
        making_amount,
        destination_network: &destination.name,
        destination_chain_id: destination.chain_id,
        receiver: &receiver_bytes,
        destination_asset: &destination_asset_bytes,
        taking_amount,
        salt: &salt,
    });

    Ok(Order {
        order_hash,
        maker: user_address.to_string(),
        receiver: receiver.to_string(),
        source_network: source.name.clone(),
        destination_network: destination.name.clone(),
        source_token: source_asset.symbol.clone(),
        destination_token: destination_asset.symbol.clone(),
        source_asset: source_asset.address.clone(),
        destination_asset: destination_asset.address.clone(),
        making_amount,
        taking_amount,
        salt,
    })
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Parses a positive decimal string into base units.
///
/// Rejects more fractional digits than `decimals`, signs, exponents and zero.
pub fn parse_amount(value: &str, decimals: u8) -> Result<Amount, String> {
    let value = value.trim();
    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(format!("'{}' is not a number", value));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(format!("'{}' is not a positive decimal number", value));
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(format!(
            "'{}' has more than {} decimal places",
            value, decimals
        ));
    }

    let scale = pow10(decimals)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| format!("'{}' is too large", value))?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| format!("'{}' is not a number", value))?
    };

    let amount = whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(|| format!("'{}' is too large", value))?;
    if amount == 0 {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(amount)
}

/// Converts base units between token decimals at a 1:1 rate.
///
/// Fails if the conversion would drop non-zero digits or overflow.
pub fn rescale(amount: Amount, from_decimals: u8, to_decimals: u8) -> Result<Amount, String> {
    if to_decimals >= from_decimals {
        let factor = pow10(to_decimals - from_decimals)?;
        amount
            .checked_mul(factor)
            .ok_or_else(|| "amount overflows destination token units".to_string())
    } else {
        let factor = pow10(from_decimals - to_decimals)?;
        if amount % factor != 0 {
            return Err(format!(
                "amount cannot be represented with {} decimals",
                to_decimals
            ));
        }
        Ok(amount / factor)
    }
}

fn pow10(exp: u8) -> Result<u128, String> {
    10u128
        .checked_pow(exp as u32)
        .ok_or_else(|| format!("10^{} overflows", exp))
}

// ============================================================================
// CANONICAL HASHING
// ============================================================================

/// Canonical fields hashed into the order identity.
pub struct OrderHashInput<'a> {
    pub source_network: &'a str,
    pub source_chain_id: u64,
    pub maker: &'a [u8],
    pub source_asset: &'a [u8],
    pub making_amount: Amount,
    pub destination_network: &'a str,
    pub destination_chain_id: u64,
    pub receiver: &'a [u8],
    pub destination_asset: &'a [u8],
    pub taking_amount: Amount,
    pub salt: &'a [u8; 32],
}

fn put_field(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// keccak256 over length-prefixed canonical bytes.
///
/// Addresses enter as decoded bytes, never as display strings, so the same
/// account hashes identically regardless of case or encoding.
pub fn compute_order_hash(input: &OrderHashInput<'_>) -> OrderHash {
    let mut buf = Vec::with_capacity(256);
    put_field(&mut buf, ORDER_HASH_DOMAIN);
    put_field(&mut buf, input.source_network.as_bytes());
    buf.extend_from_slice(&input.source_chain_id.to_be_bytes());
    put_field(&mut buf, input.maker);
    put_field(&mut buf, input.source_asset);
    buf.extend_from_slice(&input.making_amount.to_be_bytes());
    put_field(&mut buf, input.destination_network.as_bytes());
    buf.extend_from_slice(&input.destination_chain_id.to_be_bytes());
    put_field(&mut buf, input.receiver);
    put_field(&mut buf, input.destination_asset);
    buf.extend_from_slice(&input.taking_amount.to_be_bytes());
    buf.extend_from_slice(input.salt);
    OrderHash(keccak256(&buf))
}
