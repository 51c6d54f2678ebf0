//! Signature Binding
//!
//! Messages that stake and proof signatures cover. A stake signature
//! commits to the full proof context, so a signed stake observed in one
//! proof cannot be spliced into another with a different sequence,
//! expiration or master.

use crate::core::hash::{Hash256, ProofHasher};
use crate::core::codec::Writer;
use crate::proof::encoding::{encode_unsigned, ProofContext};
use crate::proof::stake::{SignedStake, Stake};

/// Digest a stake owner signs.
pub fn stake_message(context: &ProofContext, stake: &Stake) -> Hash256 {
    let mut w = Writer::new();
    context.encode(&mut w);
    stake.encode(&mut w);

    let mut hasher = ProofHasher::for_stake();
    hasher.update_bytes(w.as_slice());
    hasher.finalize()
}

/// Digest the master key signs.
pub fn proof_message(context: &ProofContext, stakes: &[SignedStake]) -> Hash256 {
    let unsigned = encode_unsigned(context, stakes);

    let mut hasher = ProofHasher::for_proof();
    hasher.update_bytes(unsigned.as_slice());
    hasher.finalize()
}
