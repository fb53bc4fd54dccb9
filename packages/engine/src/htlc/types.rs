// packages/engine/src/htlc/types.rs
//! Value types shared between the wire adapter and the decision engine

use crate::lnd::proto::routerrpc;
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Identifies an HTLC within a node: (channel id, HTLC id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CircuitKey {
    pub chan_id: u64,
    pub htlc_id: u64,
}

impl CircuitKey {
    pub fn new(chan_id: u64, htlc_id: u64) -> Self {
        Self { chan_id, htlc_id }
    }
}

impl fmt::Display for CircuitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chan_id, self.htlc_id)
    }
}

impl From<routerrpc::CircuitKey> for CircuitKey {
    fn from(key: routerrpc::CircuitKey) -> Self {
        Self {
            chan_id: key.chan_id,
            htlc_id: key.htlc_id,
        }
    }
}

impl From<CircuitKey> for routerrpc::CircuitKey {
    fn from(key: CircuitKey) -> Self {
        Self {
            chan_id: key.chan_id,
            htlc_id: key.htlc_id,
        }
    }
}

/// Payment hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Parse a hash from raw bytes, rejecting anything but 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        <[u8; 32]>::try_from(bytes)
            .map(Self)
            .map_err(|_| EngineError::InvalidHash(bytes.len()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(&hex::decode(s)?)
    }
}

/// Payment preimage; its SHA-256 is the payment hash
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Preimage(pub [u8; 32]);

impl Preimage {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        <[u8; 32]>::try_from(bytes)
            .map(Self)
            .map_err(|_| EngineError::InvalidPreimage(bytes.len()))
    }

    pub fn hash(&self) -> Hash {
        Hash(Sha256::digest(self.0).into())
    }

    /// Check whether this preimage unlocks the given payment hash
    pub fn matches(&self, hash: &Hash) -> bool {
        self.hash() == *hash
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Preimage(..)")
    }
}

impl FromStr for Preimage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(&hex::decode(s)?)
    }
}

/// Compressed secp256k1 public key identifying a node
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PubKey([u8; 33]);

impl PubKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key = <[u8; 33]>::try_from(bytes).map_err(|_| {
            EngineError::InvalidPubKey(format!("expected 33 bytes, got {}", bytes.len()))
        })?;

        if key[0] != 0x02 && key[0] != 0x03 {
            return Err(EngineError::InvalidPubKey(format!(
                "bad prefix byte {:#04x}",
                key[0]
            )));
        }

        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", self)
    }
}

impl FromStr for PubKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| EngineError::InvalidPubKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256 of 32 zero bytes
    const ZERO_PREIMAGE_HASH: &str =
        "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925";

    #[test]
    fn test_hash_rejects_wrong_length() {
        assert!(matches!(
            Hash::from_slice(&[0u8; 31]),
            Err(EngineError::InvalidHash(31))
        ));
        assert!(matches!(
            Hash::from_slice(&[]),
            Err(EngineError::InvalidHash(0))
        ));
        assert!(Hash::from_slice(&[1u8; 32]).is_ok());
    }

    #[test]
    fn test_preimage_hash() {
        let preimage = Preimage([0u8; 32]);
        let hash: Hash = ZERO_PREIMAGE_HASH.parse().unwrap();

        assert_eq!(preimage.hash(), hash);
        assert!(preimage.matches(&hash));
        assert!(!Preimage([1u8; 32]).matches(&hash));
    }

    #[test]
    fn test_preimage_rejects_wrong_length() {
        assert!(matches!(
            Preimage::from_slice(&[7u8; 31]),
            Err(EngineError::InvalidPreimage(31))
        ));
        assert!(matches!(
            "07".repeat(33).parse::<Preimage>(),
            Err(EngineError::InvalidPreimage(33))
        ));

        let preimage = Preimage::from_slice(&[7u8; 32]).unwrap();
        assert_eq!(preimage.as_bytes(), &[7u8; 32]);
        assert_eq!("07".repeat(32).parse::<Preimage>().unwrap(), preimage);
    }

    #[test]
    fn test_preimage_debug_is_redacted() {
        let preimage = Preimage([0xab; 32]);
        assert_eq!(format!("{:?}", preimage), "Preimage(..)");
    }

    #[test]
    fn test_circuit_key_wire_conversion() {
        let key = CircuitKey::new(7, 42);
        let wire: routerrpc::CircuitKey = key.into();

        assert_eq!(wire.chan_id, 7);
        assert_eq!(wire.htlc_id, 42);
        assert_eq!(CircuitKey::from(wire), key);
        assert_eq!(key.to_string(), "7:42");
    }

    #[test]
    fn test_pubkey_parse() {
        let hex_key = format!("02{}", "11".repeat(32));
        let key: PubKey = hex_key.parse().unwrap();
        assert_eq!(key.to_string(), hex_key);

        let bad_prefix = format!("05{}", "11".repeat(32));
        assert!(bad_prefix.parse::<PubKey>().is_err());
        assert!("0211".parse::<PubKey>().is_err());
    }
}
