//! # SHA-256 Digests and Key Identifiers
//!
//! Domain-separated SHA-256 hashing and the `Ski` (subject key identifier)
//! newtype used to name keys in the engine key store.
//!
//! Every hash input is framed as `domain ‖ len(part) ‖ part ‖ ...` with
//! 8-byte big-endian lengths, so distinct part lists never collide.

use sha2::{Digest, Sha256};

/// Subject key identifier: SHA-256 of a key's public encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ski(pub [u8; 32]);

impl Ski {
    /// Compute the identifier of a public key encoding.
    pub fn of(public: &[u8]) -> Self {
        Self(tagged_hash("idmx/ski", &[public]))
    }

    /// Return the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the identifier as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Ski {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ski({}...)", hex::encode(&self.0[..4]))
    }
}

impl std::fmt::Display for Ski {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Plain SHA-256 of a byte string.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256 of a byte string.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Domain-separated SHA-256 over length-framed parts.
pub fn tagged_hash(domain: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}
