//! Stake Commitments
//!
//! A stake claims one ledger output as collateral. Descriptors are the
//! loosely validated input from a cooperative caller; `Stake` is the
//! checked form that gets signed.

use std::fmt;

use crate::core::codec::{DecodeError, Reader, Writer};
use crate::core::keys::{CompressedPubKey, PrivateKey, SchnorrSig, PUBKEY_LEN};
use crate::error::ProofError;

/// Amount in the smallest ledger unit.
pub type Amount = i64;

/// Transaction identifier.
pub type TxId = [u8; 32];

/// Largest height that survives the coinbase bit packing.
pub const MAX_STAKE_HEIGHT: u32 = 0x7fff_ffff;

/// Reference to a transaction output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outpoint {
    /// Transaction id.
    pub txid: TxId,
    /// Output index.
    pub vout: u32,
}

impl Outpoint {
    /// Create an outpoint.
    pub const fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({}:{})", &hex::encode(self.txid)[..16], self.vout)
    }
}

/// A ledger output claimed as stake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Stake {
    /// Claimed output.
    pub outpoint: Outpoint,
    /// Output value.
    pub amount: Amount,
    /// Height of the block that created the output.
    pub height: u32,
    /// Output was created by a coinbase transaction.
    pub is_coinbase: bool,
    /// Key that must sign this stake.
    pub pubkey: CompressedPubKey,
}

impl Stake {
    /// Height and coinbase flag packed as on the wire.
    pub fn height_and_coinbase(&self) -> u32 {
        (self.height << 1) | self.is_coinbase as u32
    }

    /// Check the value invariants shared by the builder and the validator.
    pub fn check(&self) -> Result<(), ProofError> {
        if self.amount <= 0 {
            return Err(ProofError::invalid_parameter("amount must be positive"));
        }
        if self.height == 0 || self.height > MAX_STAKE_HEIGHT {
            return Err(ProofError::invalid_parameter("height must be positive"));
        }
        Ok(())
    }

    pub(crate) fn encode(&self, w: &mut Writer) {
        w.put_bytes(&self.outpoint.txid);
        w.put_u32(self.outpoint.vout);
        w.put_i64(self.amount);
        w.put_u32(self.height_and_coinbase());
        w.put_bytes(&self.pubkey.0);
    }

    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let txid = r.array::<32>("stake txid")?;
        let vout = r.u32("stake vout")?;
        let amount = r.i64("stake amount")?;
        let packed = r.u32("stake height")?;
        let pubkey = CompressedPubKey(r.array::<PUBKEY_LEN>("stake pubkey")?);
        Ok(Self {
            outpoint: Outpoint::new(txid, vout),
            amount,
            height: packed >> 1,
            is_coinbase: packed & 1 == 1,
            pubkey,
        })
    }
}

/// A stake together with its owner's signature over the binder message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignedStake {
    /// The claimed output.
    pub stake: Stake,
    /// Owner signature.
    pub signature: SchnorrSig,
}

impl SignedStake {
    /// Outpoint of the underlying stake.
    pub fn outpoint(&self) -> &Outpoint {
        &self.stake.outpoint
    }

    pub(crate) fn encode(&self, w: &mut Writer) {
        self.stake.encode(w);
        w.put_bytes(&self.signature);
    }

    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let stake = Stake::decode(r)?;
        let signature = r.array::<64>("stake signature")?;
        Ok(Self { stake, signature })
    }
}

/// Caller-supplied stake input.
///
/// Numeric fields are wide and signed so that out-of-range values reach
/// the entry gate and get a precise error; `amount` is optional so that
/// absence is distinguishable from zero.
#[derive(Clone, Debug)]
pub struct StakeDescriptor {
    /// Output transaction id.
    pub txid: TxId,
    /// Output index.
    pub vout: i64,
    /// Output value.
    pub amount: Option<Amount>,
    /// Creation height.
    pub height: i64,
    /// Coinbase output.
    pub is_coinbase: bool,
    /// Owner key, hex encoded.
    pub private_key: String,
}

/// A descriptor that passed the entry gate.
#[derive(Clone, Debug)]
pub struct CheckedStake {
    /// Stake fields, with the owner key derived from `key`.
    pub stake: Stake,
    /// Signing key.
    pub key: PrivateKey,
}

impl StakeDescriptor {
    /// Run the per-descriptor entry checks.
    ///
    /// Shape checks run before the key is decoded. Duplicate outpoints
    /// are detected by the builder, which sees the whole list.
    pub fn check(&self) -> Result<CheckedStake, ProofError> {
        let vout = u32::try_from(self.vout)
            .map_err(|_| ProofError::invalid_parameter("vout must be positive"))?;

        let height = u32::try_from(self.height)
            .ok()
            .filter(|h| (1..=MAX_STAKE_HEIGHT).contains(h))
            .ok_or_else(|| ProofError::invalid_parameter("height must be positive"))?;

        let amount = self.amount.ok_or(ProofError::MissingField("amount"))?;
        if amount <= 0 {
            return Err(ProofError::invalid_parameter("amount must be positive"));
        }

        let key = PrivateKey::from_hex(&self.private_key)?;

        let stake = Stake {
            outpoint: Outpoint::new(self.txid, vout),
            amount,
            height,
            is_coinbase: self.is_coinbase,
            pubkey: key.public_key(),
        };
        stake.check()?;

        Ok(CheckedStake { stake, key })
    }
}
