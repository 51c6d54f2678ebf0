//! Proof Errors
//!
//! One error type shared by the builder and the validator. Kinds are
//! independent of the component that raises them.

use thiserror::Error;

use crate::core::codec::DecodeError;
use crate::proof::stake::Outpoint;

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Field has a legal shape but an illegal value.
    InvalidParameter,
    /// Required field absent.
    MissingField,
    /// Key does not decode onto the curve.
    InvalidKey,
    /// Outpoint repeated within one proof.
    DuplicateStake,
    /// Wire bytes do not decode.
    MalformedProof,
    /// Stake signature does not verify.
    InvalidStakeSignature,
    /// Proof signature does not verify.
    InvalidProofSignature,
    /// Proof expired at the supplied time.
    ExpiredProof,
    /// Ledger cannot confirm the outpoint.
    StakeNotFound,
    /// Ledger disagrees with the claimed amount or height.
    StakeMismatch,
}

/// Errors raised while building or validating proofs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// A field has a syntactically valid but semantically illegal value.
    #[error("{0}")]
    InvalidParameter(String),

    /// A required field was not supplied.
    #[error("Missing {0}")]
    MissingField(&'static str),

    /// A private or public key failed to decode.
    #[error("{0}")]
    InvalidKey(String),

    /// The same outpoint appears twice.
    #[error("duplicate stake {0}")]
    DuplicateStake(Outpoint),

    /// Wire bytes do not deserialize to a proof.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// A stake signature does not verify against its owner key.
    #[error("invalid signature for stake {index}")]
    InvalidStakeSignature {
        /// Position of the stake in the proof.
        index: usize,
    },

    /// The master signature does not verify.
    #[error("invalid proof signature")]
    InvalidProofSignature,

    /// `now` is at or past a non-zero expiration time.
    #[error("proof expired at {expiration} (now {now})")]
    ExpiredProof {
        /// Proof expiration time.
        expiration: i64,
        /// Time supplied by the caller.
        now: i64,
    },

    /// The outpoint is unknown, spent, or the lookup timed out.
    #[error("stake {0} not found")]
    StakeNotFound(Outpoint),

    /// The ledger records a different amount, height or coinbase flag.
    #[error("stake {0} does not match the ledger")]
    StakeMismatch(Outpoint),
}

impl ProofError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::DuplicateStake(_) => ErrorKind::DuplicateStake,
            Self::MalformedProof(_) => ErrorKind::MalformedProof,
            Self::InvalidStakeSignature { .. } => ErrorKind::InvalidStakeSignature,
            Self::InvalidProofSignature => ErrorKind::InvalidProofSignature,
            Self::ExpiredProof { .. } => ErrorKind::ExpiredProof,
            Self::StakeNotFound(_) => ErrorKind::StakeNotFound,
            Self::StakeMismatch(_) => ErrorKind::StakeMismatch,
        }
    }

    /// Whether the outcome holds for the bytes regardless of time or
    /// ledger state, so it may be cached.
    pub fn is_permanent(&self) -> bool {
        !matches!(
            self,
            Self::ExpiredProof { .. } | Self::StakeNotFound(_) | Self::StakeMismatch(_)
        )
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

impl From<DecodeError> for ProofError {
    fn from(err: DecodeError) -> Self {
        Self::MalformedProof(err.to_string())
    }
}
