//! Proof Hashing
//!
//! Domain-separated SHA-256 used for:
//! - Proof identifiers (content addressing, cache keys)
//! - Stake binder messages
//! - Proof signing messages

use std::fmt;

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type Hash256 = [u8; 32];

/// Domain tag for proof identifiers.
pub const PROOF_ID_DOMAIN: &[u8] = b"AVAPROOF_ID_V1";

/// Domain tag for stake binder messages.
pub const STAKE_DOMAIN: &[u8] = b"AVAPROOF_STAKE_V1";

/// Domain tag for proof signing messages.
pub const PROOF_DOMAIN: &[u8] = b"AVAPROOF_PROOF_V1";

/// Content-addressed identifier of a serialized proof.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProofId(pub Hash256);

impl ProofId {
    /// Derive the identifier of canonical proof bytes.
    pub fn from_bytes(encoded: &[u8]) -> Self {
        Self(hash_with_domain(PROOF_ID_DOMAIN, encoded))
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofId({})", &self.to_hex()[..16])
    }
}

/// Incremental hasher with a domain separator.
///
/// Order of updates is part of the message; callers feed fields
/// in their canonical order.
pub struct ProofHasher {
    hasher: Sha256,
}

impl ProofHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for stake binder messages.
    pub fn for_stake() -> Self {
        Self::new(STAKE_DOMAIN)
    }

    /// Create hasher for proof signing messages.
    pub fn for_proof() -> Self {
        Self::new(PROOF_DOMAIN)
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Hash256 {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Hash256 {
    let mut hasher = ProofHasher::new(domain);
    hasher.update_bytes(data);
    hasher.finalize()
}
