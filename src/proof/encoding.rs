//! Proof Object and Wire Format
//!
//! The canonical encoding is the single source of truth for both
//! signatures and the proof identifier:
//!
//! ```text
//! u8        version
//! u64       sequence
//! i64       expiration time
//! [u8; 33]  master public key
//! compact   stake count
//! stakes    txid | vout | amount | height<<1|coinbase | pubkey | signature
//! [u8; 64]  proof signature
//! ```

use std::fmt;

use crate::core::codec::{DecodeError, Reader, Writer};
use crate::core::hash::ProofId;
use crate::core::keys::{CompressedPubKey, SchnorrSig, PUBKEY_LEN};
use crate::error::ProofError;
use crate::proof::stake::{Amount, SignedStake};

/// Current wire format version.
pub const PROOF_VERSION: u8 = 1;

/// Maximum number of stakes in one proof.
pub const MAX_PROOF_STAKES: usize = 1000;

/// Encoded size of the fixed proof header.
const HEADER_LEN: usize = 1 + 8 + 8 + PUBKEY_LEN;

/// Encoded size of one signed stake.
const SIGNED_STAKE_LEN: usize = 32 + 4 + 8 + 4 + PUBKEY_LEN + 64;

/// Fields every signature in a proof commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProofContext {
    /// Monotonic counter per master key.
    pub sequence: u64,
    /// Unix seconds; 0 never expires.
    pub expiration_time: i64,
    /// Key that signs the assembled proof.
    pub master: CompressedPubKey,
}

impl ProofContext {
    pub(crate) fn encode(&self, w: &mut Writer) {
        w.put_u8(PROOF_VERSION);
        w.put_u64(self.sequence);
        w.put_i64(self.expiration_time);
        w.put_bytes(&self.master.0);
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = r.u8("version")?;
        if version != PROOF_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        Ok(Self {
            sequence: r.u64("sequence")?,
            expiration_time: r.i64("expiration time")?,
            master: CompressedPubKey(r.array::<PUBKEY_LEN>("master public key")?),
        })
    }
}

/// Encode everything the master signature covers.
pub(crate) fn encode_unsigned(context: &ProofContext, stakes: &[SignedStake]) -> Writer {
    let mut w = Writer::with_capacity(HEADER_LEN + 3 + stakes.len() * SIGNED_STAKE_LEN + 64);
    context.encode(&mut w);
    w.put_compact_size(stakes.len() as u64);
    for stake in stakes {
        stake.encode(&mut w);
    }
    w
}

/// A signed aggregate of stakes attributable to one master key.
///
/// Immutable: the identifier is derived from the canonical bytes at
/// construction and never recomputed.
#[derive(Clone, PartialEq, Eq)]
pub struct Proof {
    context: ProofContext,
    stakes: Vec<SignedStake>,
    signature: SchnorrSig,
    id: ProofId,
}

impl Proof {
    pub(crate) fn from_parts(
        context: ProofContext,
        stakes: Vec<SignedStake>,
        signature: SchnorrSig,
    ) -> Self {
        let mut w = encode_unsigned(&context, &stakes);
        w.put_bytes(&signature);
        let id = ProofId::from_bytes(w.as_slice());
        Self { context, stakes, signature, id }
    }

    /// Decode canonical bytes.
    ///
    /// Only shape is checked here; see [`crate::proof::verify`] for the
    /// structural and signature rules.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        let mut r = Reader::new(bytes);
        let context = ProofContext::decode(&mut r)?;

        let count = r.compact_size("stake", MAX_PROOF_STAKES as u64)? as usize;
        let mut stakes = Vec::with_capacity(count);
        for _ in 0..count {
            stakes.push(SignedStake::decode(&mut r)?);
        }

        let signature = r.array::<64>("proof signature")?;
        r.finish()?;

        // Canonical input: the id of the received bytes is the id of the proof.
        let id = ProofId::from_bytes(bytes);
        Ok(Self { context, stakes, signature, id })
    }

    /// Decode from hex.
    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| ProofError::MalformedProof(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Canonical encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = encode_unsigned(&self.context, &self.stakes);
        w.put_bytes(&self.signature);
        w.into_bytes()
    }

    /// Canonical encoding as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Content-addressed identifier.
    pub fn id(&self) -> ProofId {
        self.id
    }

    /// Shared signing context.
    pub fn context(&self) -> &ProofContext {
        &self.context
    }

    /// Sequence number.
    pub fn sequence(&self) -> u64 {
        self.context.sequence
    }

    /// Expiration time (0 = never).
    pub fn expiration_time(&self) -> i64 {
        self.context.expiration_time
    }

    /// Master public key.
    pub fn master(&self) -> &CompressedPubKey {
        &self.context.master
    }

    /// Stakes in signed order.
    pub fn stakes(&self) -> &[SignedStake] {
        &self.stakes
    }

    /// Master signature.
    pub fn signature(&self) -> &SchnorrSig {
        &self.signature
    }

    /// Sum of staked amounts.
    pub fn total_amount(&self) -> Amount {
        self.stakes
            .iter()
            .fold(0, |acc: Amount, s| acc.saturating_add(s.stake.amount))
    }

    /// Claimed heights in stake order.
    pub fn stake_heights(&self) -> Vec<u32> {
        self.stakes.iter().map(|s| s.stake.height).collect()
    }

    /// Whether the proof is unusable at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.context.expiration_time != 0 && now >= self.context.expiration_time
    }

    /// Whether this proof replaces `other` for peer weighting.
    pub fn supersedes(&self, other: &Proof) -> bool {
        self.context.master == other.context.master
            && self.context.sequence > other.context.sequence
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proof")
            .field("id", &self.id)
            .field("sequence", &self.context.sequence)
            .field("expiration_time", &self.context.expiration_time)
            .field("master", &self.context.master)
            .field("stakes", &self.stakes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::PrivateKey;
    use crate::proof::stake::{Outpoint, Stake};

    fn sample_proof(stake_count: usize) -> Proof {
        let owner = PrivateKey::from_bytes(&[3; 32]).unwrap().public_key();
        let master = PrivateKey::from_bytes(&[4; 32]).unwrap().public_key();
        let stakes = (0..stake_count)
            .map(|i| SignedStake {
                stake: Stake {
                    outpoint: Outpoint::new([i as u8; 32], i as u32),
                    amount: 1_000 + i as i64,
                    height: 10 + i as u32,
                    is_coinbase: i % 2 == 0,
                    pubkey: owner,
                },
                signature: [i as u8; 64],
            })
            .collect();
        let context = ProofContext { sequence: 7, expiration_time: 1_700_000_000, master };
        Proof::from_parts(context, stakes, [0xaa; 64])
    }

    #[test]
    fn test_decode_reproduces_proof() {
        let proof = sample_proof(3);
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN + 1 + 3 * SIGNED_STAKE_LEN + 64);

        let decoded = Proof::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(decoded.id(), proof.id());
    }

    #[test]
    fn test_id_commits_to_stake_order() {
        let proof = sample_proof(2);
        let mut reversed = proof.stakes().to_vec();
        reversed.reverse();
        let other = Proof::from_parts(*proof.context(), reversed, *proof.signature());
        assert_ne!(proof.id(), other.id());
    }

    #[test]
    fn test_truncated_and_extended_bytes_rejected() {
        let bytes = sample_proof(1).to_bytes();

        for len in [0, 1, HEADER_LEN, bytes.len() - 1] {
            let err = Proof::from_bytes(&bytes[..len]).unwrap_err();
            assert!(matches!(err, ProofError::MalformedProof(_)), "len {}", len);
        }

        let mut extended = bytes.clone();
        extended.push(0);
        assert!(matches!(Proof::from_bytes(&extended), Err(ProofError::MalformedProof(_))));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = sample_proof(1).to_bytes();
        bytes[0] = 2;
        let err = Proof::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, ProofError::MalformedProof("unsupported version 2".into()));
    }

    #[test]
    fn test_stake_count_bound() {
        let mut w = Writer::new();
        sample_proof(0).context().encode(&mut w);
        w.put_compact_size(MAX_PROOF_STAKES as u64 + 1);
        assert!(matches!(Proof::from_bytes(w.as_slice()), Err(ProofError::MalformedProof(_))));
    }

    #[test]
    fn test_expiry_and_supersession() {
        let proof = sample_proof(1);
        assert!(!proof.is_expired(1_699_999_999));
        assert!(proof.is_expired(1_700_000_000));

        let mut context = *proof.context();
        context.expiration_time = 0;
        context.sequence = 8;
        let newer = Proof::from_parts(context, proof.stakes().to_vec(), [0; 64]);
        assert!(!newer.is_expired(i64::MAX));
        assert!(newer.supersedes(&proof));
        assert!(!proof.supersedes(&newer));
    }

    #[test]
    fn test_totals() {
        let proof = sample_proof(3);
        assert_eq!(proof.total_amount(), 1_000 + 1_001 + 1_002);
        assert_eq!(proof.stake_heights(), vec![10, 11, 12]);
    }
}
