//! # Avalanche Proof
//!
//! Stake-backed avalanche proofs: building, canonical serialization and
//! validation against a ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AVALANCHE PROOF                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                               │
//! │  ├── codec.rs    - Canonical little-endian reader/writer    │
//! │  ├── hash.rs     - Domain-separated SHA-256, proof ids      │
//! │  └── keys.rs     - secp256k1 keys and Schnorr signatures    │
//! │                                                             │
//! │  proof/          - Proof construction (synchronous)         │
//! │  ├── stake.rs    - Stakes and the descriptor entry gate     │
//! │  ├── binder.rs   - Signature messages                       │
//! │  ├── encoding.rs - Proof object and wire format             │
//! │  ├── builder.rs  - ProofBuilder                             │
//! │  └── verify.rs   - Pure structural/signature checks         │
//! │                                                             │
//! │  validation/     - Peer proof acceptance (async)            │
//! │  ├── validator.rs- Pipeline, config, counters               │
//! │  ├── cache.rs    - Coalescing result cache                  │
//! │  ├── ledger.rs   - UTXO lookup                              │
//! │  ├── weight.rs   - Weight policies                          │
//! │  └── registry.rs - Supersession by sequence                 │
//! │                                                             │
//! │  rpc.rs          - JSON methods and error codes             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Building and encoding are pure: the same descriptors, keys, sequence
//! and expiration always produce the same bytes and the same
//! [`ProofId`]. Signatures use BIP340 without auxiliary randomness.
//! Validation takes the current time as an argument.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod proof;
pub mod rpc;
pub mod validation;

// Re-export commonly used types
pub use crate::core::hash::ProofId;
pub use crate::core::keys::{CompressedPubKey, PrivateKey};
pub use error::{ErrorKind, ProofError};
pub use proof::{build_proof, Outpoint, Proof, ProofBuilder, Stake, StakeDescriptor};
pub use validation::{
    LedgerLookup, MemoryLedger, Offer, PeerProofs, ProofValidator, ValidatedProof,
    ValidatorConfig, WeightPolicy,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
