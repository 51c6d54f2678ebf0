//! Core primitives.
//!
//! Byte-exact building blocks shared by the builder and the validator.

pub mod codec;
pub mod hash;
pub mod keys;

// Re-export core types
pub use codec::{DecodeError, Reader, Writer};
pub use hash::{Hash256, ProofId};
pub use keys::{verify_schnorr, CompressedPubKey, PrivateKey, SchnorrSig};
