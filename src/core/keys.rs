//! Keys and Schnorr Signatures
//!
//! secp256k1 keys with BIP340 Schnorr signatures over 32-byte digests.
//! Public keys travel in their 33-byte compressed form and are only
//! parsed when a signature is checked.

use std::fmt;
use std::sync::OnceLock;

use secp256k1::schnorr::Signature;
use secp256k1::{All, Keypair, PublicKey, Secp256k1, SecretKey};

use crate::core::hash::Hash256;
use crate::error::ProofError;

/// Serialized Schnorr signature.
pub type SchnorrSig = [u8; 64];

/// Length of a compressed public key.
pub const PUBKEY_LEN: usize = 33;

fn secp() -> &'static Secp256k1<All> {
    static CONTEXT: OnceLock<Secp256k1<All>> = OnceLock::new();
    CONTEXT.get_or_init(Secp256k1::new)
}

/// Compressed secp256k1 public key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompressedPubKey(pub [u8; PUBKEY_LEN]);

impl CompressedPubKey {
    /// Encode a parsed public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self(key.serialize())
    }

    /// Parse a hex-encoded compressed key, rejecting points off the curve.
    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        let invalid = || ProofError::InvalidKey("Invalid public key".into());
        let bytes = hex::decode(s).map_err(|_| invalid())?;
        if bytes.len() != PUBKEY_LEN {
            return Err(invalid());
        }
        let key = PublicKey::from_slice(&bytes).map_err(|_| invalid())?;
        Ok(Self::from_public_key(&key))
    }

    /// Parse onto the curve. `None` when the bytes are not a valid point.
    pub fn to_public_key(&self) -> Option<PublicKey> {
        PublicKey::from_slice(&self.0).ok()
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CompressedPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", self.to_hex())
    }
}

impl fmt::Display for CompressedPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A secp256k1 signing key.
#[derive(Clone)]
pub struct PrivateKey {
    keypair: Keypair,
}

impl PrivateKey {
    /// Build from a raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, ProofError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| ProofError::InvalidKey("Invalid private key".into()))?;
        Ok(Self { keypair: Keypair::from_secret_key(secp(), &secret) })
    }

    /// Parse a 64-character hex scalar.
    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        let bytes: [u8; 32] = hex::decode(s.trim())
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| ProofError::InvalidKey("Invalid private key".into()))?;
        Self::from_bytes(&bytes)
    }

    /// Compressed public key of this private key.
    pub fn public_key(&self) -> CompressedPubKey {
        CompressedPubKey::from_public_key(&self.keypair.public_key())
    }

    /// Sign a 32-byte digest.
    ///
    /// Uses no auxiliary randomness, so signing is deterministic and
    /// rebuilding a proof from the same inputs yields the same bytes.
    pub fn sign(&self, digest: &Hash256) -> SchnorrSig {
        secp()
            .sign_schnorr_no_aux_rand(&digest[..], &self.keypair)
            .serialize()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key().to_hex())
    }
}

/// Verify a Schnorr signature over `digest` against a compressed key.
///
/// Keys that do not parse never verify.
pub fn verify_schnorr(digest: &Hash256, signature: &SchnorrSig, pubkey: &CompressedPubKey) -> bool {
    let Some(key) = pubkey.to_public_key() else {
        return false;
    };
    let (xonly, _parity) = key.x_only_public_key();
    let Ok(sig) = Signature::from_slice(signature) else {
        return false;
    };
    secp().verify_schnorr(&sig, &digest[..], &xonly).is_ok()
}
