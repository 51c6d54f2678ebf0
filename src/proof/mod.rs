//! Avalanche Proof System
//!
//! Stake-backed proofs that weight peers in pre-consensus voting:
//! - Stake commitments and the entry gate for caller input
//! - Signature binding of stakes to one proof context
//! - Canonical encoding and content-addressed ids
//! - Building and pure verification
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  stake.rs        - Outpoints, stakes, typed descriptors     │
//! │  binder.rs       - Messages stake/proof signatures cover    │
//! │  encoding.rs     - Proof object and wire format             │
//! │  builder.rs      - Sign stakes, sign proof, derive id       │
//! │  verify.rs       - Structure and signature checks           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod stake;
pub mod binder;
pub mod encoding;
pub mod builder;
pub mod verify;

// Re-export key types
pub use stake::{Amount, CheckedStake, Outpoint, SignedStake, Stake, StakeDescriptor, TxId};
pub use binder::{proof_message, stake_message};
pub use encoding::{Proof, ProofContext, MAX_PROOF_STAKES, PROOF_VERSION};
pub use builder::{build_proof, ProofBuilder};
pub use verify::{
    check_expiry, check_structure, verify_proof, verify_proof_signature, verify_stake_signatures,
};
