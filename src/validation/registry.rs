//! Peer Proof Registry
//!
//! Tracks the current proof per master key. A later proof from the same
//! master with a strictly higher sequence replaces the earlier one
//! without invalidating it.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::core::hash::ProofId;
use crate::core::keys::CompressedPubKey;
use crate::validation::validator::ValidatedProof;

/// Lifecycle of a proof id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofState {
    /// Never seen.
    Unseen,
    /// Validation in flight.
    Validating,
    /// Accepted.
    Valid,
    /// Rejected.
    Invalid,
    /// Accepted, then replaced by a higher sequence from the same master.
    Superseded,
}

/// Result of offering a validated proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// First proof for this master.
    Added,
    /// Replaced the previous current proof.
    Replaced {
        /// Proof that is no longer current.
        superseded: ProofId,
    },
    /// Lower sequence than the current proof; ignored.
    Stale {
        /// Proof that stays current.
        current: ProofId,
    },
    /// Same sequence, different proof; the existing one stays current.
    Conflicting {
        /// Proof that stays current.
        current: ProofId,
    },
    /// This exact proof is already current.
    AlreadyKnown,
}

/// Current proofs keyed by master.
#[derive(Debug, Default)]
pub struct PeerProofs {
    current: HashMap<CompressedPubKey, ValidatedProof>,
    superseded: HashSet<ProofId>,
}

impl PeerProofs {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an accepted proof.
    pub fn offer(&mut self, validated: ValidatedProof) -> Offer {
        let master = *validated.proof.master();
        let id = validated.id();

        let Some(existing) = self.current.get(&master) else {
            info!(proof_id = %id, %master, "added peer proof");
            self.current.insert(master, validated);
            return Offer::Added;
        };

        let current = existing.id();
        if current == id {
            return Offer::AlreadyKnown;
        }

        let (old, new) = (existing.proof.sequence(), validated.proof.sequence());
        if new > old {
            info!(proof_id = %id, superseded = %current, sequence = new, "replaced peer proof");
            self.superseded.insert(current);
            self.superseded.remove(&id);
            self.current.insert(master, validated);
            Offer::Replaced { superseded: current }
        } else if new < old {
            debug!(proof_id = %id, %current, "stale peer proof");
            Offer::Stale { current }
        } else {
            debug!(proof_id = %id, %current, sequence = new, "conflicting peer proof");
            Offer::Conflicting { current }
        }
    }

    /// Current proof for `master`.
    pub fn current(&self, master: &CompressedPubKey) -> Option<&ValidatedProof> {
        self.current.get(master)
    }

    /// Registry view of `id`: `Valid`, `Superseded` or `Unseen`.
    pub fn state(&self, id: &ProofId) -> ProofState {
        if self.superseded.contains(id) {
            ProofState::Superseded
        } else if self.current.values().any(|v| v.id() == *id) {
            ProofState::Valid
        } else {
            ProofState::Unseen
        }
    }

    /// Summed weight of current proofs.
    pub fn total_weight(&self) -> u64 {
        self.current
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(v.weight))
    }

    /// Number of masters with a current proof.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether no master has a proof.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Drop current proofs expired at `now`. Returns the removed ids.
    pub fn prune_expired(&mut self, now: i64) -> Vec<ProofId> {
        let expired: Vec<_> = self
            .current
            .iter()
            .filter(|(_, v)| v.proof.is_expired(now))
            .map(|(master, v)| (*master, v.id()))
            .collect();

        for (master, _) in &expired {
            self.current.remove(master);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "pruned expired peer proofs");
        }
        expired.into_iter().map(|(_, id)| id).collect()
    }
}
