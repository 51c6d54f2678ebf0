//! Proof Verification
//!
//! Pure checks over a decoded proof: structure, stake signatures and the
//! master signature. No ledger or clock access; the async validator in
//! [`crate::validation`] layers those on top.

use std::collections::HashSet;

use crate::core::keys::verify_schnorr;
use crate::error::ProofError;
use crate::proof::binder::{proof_message, stake_message};
use crate::proof::encoding::Proof;

/// Reject empty proofs, duplicate outpoints and out-of-range stake values.
pub fn check_structure(proof: &Proof) -> Result<(), ProofError> {
    if proof.stakes().is_empty() {
        return Err(ProofError::invalid_parameter("no stakes"));
    }

    let mut seen = HashSet::with_capacity(proof.stakes().len());
    for signed in proof.stakes() {
        if !seen.insert(*signed.outpoint()) {
            return Err(ProofError::DuplicateStake(*signed.outpoint()));
        }
        signed.stake.check()?;
    }

    Ok(())
}

/// Verify every stake signature against the proof's own context.
pub fn verify_stake_signatures(proof: &Proof) -> Result<(), ProofError> {
    for (index, signed) in proof.stakes().iter().enumerate() {
        let digest = stake_message(proof.context(), &signed.stake);
        if !verify_schnorr(&digest, &signed.signature, &signed.stake.pubkey) {
            return Err(ProofError::InvalidStakeSignature { index });
        }
    }
    Ok(())
}

/// Verify the master signature.
pub fn verify_proof_signature(proof: &Proof) -> Result<(), ProofError> {
    let digest = proof_message(proof.context(), proof.stakes());
    if !verify_schnorr(&digest, proof.signature(), proof.master()) {
        return Err(ProofError::InvalidProofSignature);
    }
    Ok(())
}

/// Structure, then stake signatures, then the master signature.
pub fn verify_proof(proof: &Proof) -> Result<(), ProofError> {
    check_structure(proof)?;
    verify_stake_signatures(proof)?;
    verify_proof_signature(proof)
}

/// Reject a proof whose non-zero expiration is at or before `now`.
pub fn check_expiry(proof: &Proof, now: i64) -> Result<(), ProofError> {
    if proof.is_expired(now) {
        return Err(ProofError::ExpiredProof {
            expiration: proof.expiration_time(),
            now,
        });
    }
    Ok(())
}
