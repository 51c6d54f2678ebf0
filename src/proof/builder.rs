//! Proof Builder
//!
//! Assembles caller-supplied stakes into a signed proof. Every check is
//! local; any failure aborts the whole build and nothing partial is
//! returned.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::core::keys::{verify_schnorr, CompressedPubKey, PrivateKey};
use crate::error::ProofError;
use crate::proof::binder::{proof_message, stake_message};
use crate::proof::encoding::{Proof, ProofContext, MAX_PROOF_STAKES};
use crate::proof::stake::{CheckedStake, Outpoint, SignedStake, StakeDescriptor};

/// Builder for a single proof.
///
/// ```
/// use avaproof::{PrivateKey, ProofBuilder, StakeDescriptor};
///
/// let master = PrivateKey::from_bytes(&[1; 32]).unwrap();
/// let proof = ProofBuilder::new(0, 0, master)
///     .add_stake(&StakeDescriptor {
///         txid: [7; 32],
///         vout: 0,
///         amount: Some(50_000_000),
///         height: 1,
///         is_coinbase: true,
///         private_key: "22".repeat(32),
///     })
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(proof.stakes().len(), 1);
/// ```
#[derive(Debug)]
pub struct ProofBuilder {
    context: ProofContext,
    master: PrivateKey,
    stakes: Vec<CheckedStake>,
    outpoints: HashSet<Outpoint>,
}

impl ProofBuilder {
    /// Start a proof signed by `master`.
    pub fn new(sequence: u64, expiration_time: i64, master: PrivateKey) -> Self {
        let context = ProofContext {
            sequence,
            expiration_time,
            master: master.public_key(),
        };
        Self {
            context,
            master,
            stakes: Vec::new(),
            outpoints: HashSet::new(),
        }
    }

    /// Start a proof whose master public key was declared separately.
    ///
    /// The declared key must belong to `master`.
    pub fn with_declared_master(
        sequence: u64,
        expiration_time: i64,
        master: PrivateKey,
        declared: &CompressedPubKey,
    ) -> Result<Self, ProofError> {
        if master.public_key() != *declared {
            return Err(ProofError::InvalidKey("master key mismatch".into()));
        }
        Ok(Self::new(sequence, expiration_time, master))
    }

    /// Check a descriptor and queue it for signing.
    pub fn add_stake(self, descriptor: &StakeDescriptor) -> Result<Self, ProofError> {
        let checked = descriptor.check()?;
        self.add_checked(checked)
    }

    /// Queue a stake that already passed [`StakeDescriptor::check`].
    pub fn add_checked(mut self, checked: CheckedStake) -> Result<Self, ProofError> {
        if !self.outpoints.insert(checked.stake.outpoint) {
            return Err(ProofError::DuplicateStake(checked.stake.outpoint));
        }
        if self.stakes.len() >= MAX_PROOF_STAKES {
            return Err(ProofError::invalid_parameter("too many stakes"));
        }

        self.stakes.push(checked);
        Ok(self)
    }

    /// Add every descriptor in order, stopping at the first failure.
    pub fn add_stakes<'a, I>(self, descriptors: I) -> Result<Self, ProofError>
    where
        I: IntoIterator<Item = &'a StakeDescriptor>,
    {
        descriptors
            .into_iter()
            .try_fold(self, |builder, descriptor| builder.add_stake(descriptor))
    }

    /// Sign every stake, then the whole proof.
    #[instrument(skip(self), fields(sequence = self.context.sequence, stakes = self.stakes.len()))]
    pub fn build(self) -> Result<Proof, ProofError> {
        if self.stakes.is_empty() {
            return Err(ProofError::invalid_parameter("no stakes"));
        }

        let mut signed = Vec::with_capacity(self.stakes.len());
        for (index, checked) in self.stakes.iter().enumerate() {
            let digest = stake_message(&self.context, &checked.stake);
            let signature = checked.key.sign(&digest);

            // Self-check against the declared owner.
            if !verify_schnorr(&digest, &signature, &checked.stake.pubkey) {
                return Err(ProofError::InvalidStakeSignature { index });
            }

            #[cfg(feature = "debug-tracing")]
            debug!(index, digest = %hex::encode(digest), "signed stake");

            signed.push(SignedStake { stake: checked.stake, signature });
        }

        let digest = proof_message(&self.context, &signed);
        let signature = self.master.sign(&digest);

        let proof = Proof::from_parts(self.context, signed, signature);
        debug!(proof_id = %proof.id(), "built proof");
        Ok(proof)
    }
}

/// Build a proof from a descriptor list in one call.
pub fn build_proof(
    sequence: u64,
    expiration_time: i64,
    master: PrivateKey,
    descriptors: &[StakeDescriptor],
) -> Result<Proof, ProofError> {
    ProofBuilder::new(sequence, expiration_time, master)
        .add_stakes(descriptors)?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::proof::verify::verify_proof;

    fn master() -> PrivateKey {
        PrivateKey::from_bytes(&[0x42; 32]).unwrap()
    }

    fn descriptor(vout: i64) -> StakeDescriptor {
        StakeDescriptor {
            txid: [0x10; 32],
            vout,
            amount: Some(25_000_000),
            height: 10,
            is_coinbase: false,
            private_key: "31".repeat(32),
        }
    }

    #[test]
    fn test_build_single_stake() {
        let proof = build_proof(0, 0, master(), &[descriptor(0)]).unwrap();

        assert_eq!(proof.sequence(), 0);
        assert_eq!(proof.expiration_time(), 0);
        assert_eq!(*proof.master(), master().public_key());
        assert_eq!(proof.stakes().len(), 1);
        assert!(verify_proof(&proof).is_ok());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build_proof(3, 100, master(), &[descriptor(0), descriptor(1)]).unwrap();
        let b = build_proof(3, 100, master(), &[descriptor(0), descriptor(1)]).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_stake_order_is_preserved() {
        let a = build_proof(0, 0, master(), &[descriptor(0), descriptor(1)]).unwrap();
        let b = build_proof(0, 0, master(), &[descriptor(1), descriptor(0)]).unwrap();
        assert_eq!(a.stakes()[0].outpoint().vout, 0);
        assert_eq!(b.stakes()[0].outpoint().vout, 1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_duplicate_outpoint_rejected() {
        let err = build_proof(0, 0, master(), &[descriptor(0), descriptor(0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateStake);
    }

    #[test]
    fn test_empty_rejected() {
        let err = build_proof(0, 0, master(), &[]).unwrap_err();
        assert_eq!(err, ProofError::InvalidParameter("no stakes".into()));
    }

    #[test]
    fn test_first_failure_wins() {
        let mut bad_key = descriptor(1);
        bad_key.private_key = "foobar".into();
        let mut bad_vout = descriptor(2);
        bad_vout.vout = -1;

        let err = build_proof(0, 0, master(), &[descriptor(0), bad_key, bad_vout]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_declared_master_must_match() {
        let declared = master().public_key();
        assert!(ProofBuilder::with_declared_master(0, 0, master(), &declared).is_ok());

        let other = PrivateKey::from_bytes(&[0x43; 32]).unwrap();
        let err = ProofBuilder::with_declared_master(0, 0, other, &declared).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_add_checked_detects_duplicates() {
        let checked = descriptor(0).check().unwrap();
        let builder = ProofBuilder::new(0, 0, master()).add_checked(checked.clone()).unwrap();

        let err = builder.add_checked(checked).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateStake);
    }

    #[test]
    fn test_too_many_stakes() {
        let descriptors: Vec<_> = (0..=MAX_PROOF_STAKES as i64).map(descriptor).collect();
        let err = ProofBuilder::new(0, 0, master())
            .add_stakes(&descriptors)
            .unwrap_err();
        assert_eq!(err, ProofError::InvalidParameter("too many stakes".into()));
    }
}
