//! Content hashing: digests, algorithms, and the content hasher.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Hash digest size in bytes (both supported algorithms produce 256-bit hashes).
pub const HASH_SIZE: usize = 32;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    Blake3,
    /// SHA-256.
    Sha256,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
            Algorithm::Sha256 => "sha2-256",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" => Ok(Algorithm::Blake3),
            "sha2-256" => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Returns the algorithm ID byte (for record headers).
    pub fn id(&self) -> u8 {
        match self {
            Algorithm::Blake3 => 1,
            Algorithm::Sha256 => 2,
        }
    }

    /// Parse algorithm from ID byte.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Algorithm::Blake3),
            2 => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(format!("ID {}", id))),
        }
    }
}

/// A 32-byte content address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a hex string (64 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }

    /// Convert to hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the first 2 hex characters (for directory sharding).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Get the remaining 62 hex characters (for filename).
    pub fn suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A stateful hash primitive: reset, absorb bytes, produce a digest.
pub trait Digester {
    /// The algorithm this primitive implements.
    const ALGORITHM: Algorithm;

    /// Discard everything absorbed so far.
    fn reset(&mut self);

    /// Absorb bytes.
    fn update(&mut self, data: &[u8]);

    /// Produce the digest of everything absorbed since the last reset.
    fn finalize(&self) -> Hash;
}

impl Digester for blake3::Hasher {
    const ALGORITHM: Algorithm = Algorithm::Blake3;

    fn reset(&mut self) {
        blake3::Hasher::reset(self);
    }

    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn finalize(&self) -> Hash {
        Hash(*blake3::Hasher::finalize(self).as_bytes())
    }
}

impl Digester for sha2::Sha256 {
    const ALGORITHM: Algorithm = Algorithm::Sha256;

    fn reset(&mut self) {
        sha2::Digest::reset(self);
    }

    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(self, data);
    }

    fn finalize(&self) -> Hash {
        let out = sha2::Digest::finalize(self.clone());
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&out);
        Hash(bytes)
    }
}

/// Computes content addresses with an injected [`Digester`].
///
/// Every call to [`ContentHasher::digest`] resets the primitive first, so a
/// digest never depends on earlier inputs.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher<D = blake3::Hasher> {
    inner: D,
}

impl ContentHasher<blake3::Hasher> {
    /// A content hasher backed by BLAKE3.
    pub fn blake3() -> Self {
        Self::new(blake3::Hasher::new())
    }
}

impl ContentHasher<sha2::Sha256> {
    /// A content hasher backed by SHA-256.
    pub fn sha256() -> Self {
        Self::new(<sha2::Sha256 as sha2::Digest>::new())
    }
}

impl<D: Digester> ContentHasher<D> {
    /// Wrap a hash primitive.
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    /// The algorithm of the wrapped primitive.
    pub fn algorithm(&self) -> Algorithm {
        D::ALGORITHM
    }

    /// Hash `data` from a clean state.
    pub fn digest(&mut self, data: &[u8]) -> Hash {
        self.inner.reset();
        self.inner.update(data);
        self.inner.finalize()
    }
}
