//! Secret and hashlock generation
//!
//! Each order gets a fresh 256-bit secret. Only its keccak256 hash is
//! published until the release transaction reveals the secret on-chain.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

pub const SECRET_LEN: usize = 32;

/// Preimage gating release of both legs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(#[serde(with = "hex32")] [u8; SECRET_LEN]);

impl Secret {
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Public commitment plus the secret it commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashLock {
    #[serde(with = "hex32")]
    pub hash: [u8; 32],
    pub secret: Secret,
}

impl HashLock {
    pub fn new(secret: Secret) -> Self {
        Self {
            hash: hash_secret(&secret),
            secret,
        }
    }

    /// Fresh secret and its commitment.
    pub fn generate() -> Self {
        Self::new(generate_secret())
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

/// Draws a secret from the operating system CSPRNG.
pub fn generate_secret() -> Secret {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    Secret(bytes)
}

/// keccak256 of the secret, as verified by EVM escrows on `withdraw`.
pub fn hash_secret(secret: &Secret) -> [u8; 32] {
    keccak256(&secret.0)
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Serde helper for 32-byte values as 0x-prefixed hex strings.
pub mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parses 0x-prefixed (or bare) 64-character hex.
    pub fn parse(s: &str) -> Result<[u8; 32], String> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| format!("invalid hex '{}': {}", s, e))?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("expected 32 bytes, got {}", b.len()))
    }
}
