//! RPC Adapter
//!
//! JSON surface for building, decoding and verifying proofs. Parameter
//! objects follow node RPC conventions: lowercase keys, hex strings for
//! hashes and keys, amounts in smallest units. Failures carry the node's
//! numeric error codes.
//!
//! Parameter structs also accept positional arrays, so
//! `{"method":"buildavalancheproof","params":[0, 0, "<pubkey>", [..], "<privkey>"]}`
//! works.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::keys::{CompressedPubKey, PrivateKey};
use crate::error::{ErrorKind, ProofError};
use crate::proof::builder::ProofBuilder;
use crate::proof::encoding::Proof;
use crate::proof::stake::{Amount, CheckedStake, StakeDescriptor, TxId};
use crate::validation::validator::ProofValidator;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Invalid, missing or duplicate parameter.
pub const RPC_INVALID_PARAMETER: i32 = -8;
/// Parameter could not be parsed or has an illegal value.
pub const RPC_DESERIALIZATION_ERROR: i32 = -22;
/// Proof failed verification.
pub const RPC_VERIFY_ERROR: i32 = -25;
/// Unknown method.
pub const RPC_METHOD_NOT_FOUND: i32 = -32601;
/// Server-side failure.
pub const RPC_INTERNAL_ERROR: i32 = -32603;

/// Error returned to RPC callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct RpcError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl RpcError {
    /// Create an error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<ProofError> for RpcError {
    fn from(err: ProofError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidParameter | ErrorKind::MalformedProof => RPC_DESERIALIZATION_ERROR,
            ErrorKind::MissingField | ErrorKind::InvalidKey | ErrorKind::DuplicateStake => {
                RPC_INVALID_PARAMETER
            }
            ErrorKind::InvalidStakeSignature
            | ErrorKind::InvalidProofSignature
            | ErrorKind::ExpiredProof
            | ErrorKind::StakeNotFound
            | ErrorKind::StakeMismatch => RPC_VERIFY_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(RPC_DESERIALIZATION_ERROR, err.to_string())
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// One stake as supplied to `buildavalancheproof`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeParam {
    /// Transaction id, 64 hex characters.
    pub txid: String,
    /// Output index.
    pub vout: i64,
    /// Output value in smallest units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    /// Creation height.
    pub height: i64,
    /// Coinbase output.
    #[serde(default)]
    pub iscoinbase: bool,
    /// Owner private key, 64 hex characters.
    pub privatekey: String,
}

impl StakeParam {
    /// Convert to a typed descriptor. Only the txid is checked here.
    pub fn to_descriptor(&self) -> Result<StakeDescriptor, RpcError> {
        let txid: TxId = hex::decode(&self.txid)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                RpcError::new(RPC_INVALID_PARAMETER, "txid must be a 64 character hex string")
            })?;

        Ok(StakeDescriptor {
            txid,
            vout: self.vout,
            amount: self.amount,
            height: self.height,
            is_coinbase: self.iscoinbase,
            private_key: self.privatekey.clone(),
        })
    }
}

/// `buildavalancheproof` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildParams {
    /// Proof sequence number.
    pub sequence: u64,
    /// Expiration time, 0 for never.
    pub expiration: i64,
    /// Master public key, 66 hex characters.
    pub master: String,
    /// Stakes in proof order.
    pub stakes: Vec<StakeParam>,
    /// Private key of `master`, 64 hex characters. Signs the proof.
    pub masterprivkey: String,
}

/// Hex-encoded proof parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofParam {
    /// Serialized proof.
    pub proof: String,
}

// =============================================================================
// RESULTS
// =============================================================================

/// `decodeavalancheproof` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedProof {
    /// Proof id.
    pub proofid: String,
    /// Sequence number.
    pub sequence: u64,
    /// Expiration time.
    pub expiration: i64,
    /// Master public key.
    pub master: String,
    /// Stakes in proof order.
    pub stakes: Vec<DecodedStake>,
    /// Master signature.
    pub signature: String,
}

/// One stake of a decoded proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedStake {
    /// Transaction id.
    pub txid: String,
    /// Output index.
    pub vout: u32,
    /// Output value.
    pub amount: Amount,
    /// Creation height.
    pub height: u32,
    /// Coinbase output.
    pub iscoinbase: bool,
    /// Owner public key.
    pub pubkey: String,
    /// Stake signature.
    pub signature: String,
}

impl From<&Proof> for DecodedProof {
    fn from(proof: &Proof) -> Self {
        Self {
            proofid: proof.id().to_hex(),
            sequence: proof.sequence(),
            expiration: proof.expiration_time(),
            master: proof.master().to_hex(),
            stakes: proof
                .stakes()
                .iter()
                .map(|s| DecodedStake {
                    txid: hex::encode(s.stake.outpoint.txid),
                    vout: s.stake.outpoint.vout,
                    amount: s.stake.amount,
                    height: s.stake.height,
                    iscoinbase: s.stake.is_coinbase,
                    pubkey: s.stake.pubkey.to_hex(),
                    signature: hex::encode(s.signature),
                })
                .collect(),
            signature: hex::encode(proof.signature()),
        }
    }
}

/// `verifyavalancheproof` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    /// Always true; failures are errors.
    pub valid: bool,
    /// Proof id.
    pub proofid: String,
    /// Weight assigned by the validator's policy.
    pub weight: u64,
}

// =============================================================================
// METHODS
// =============================================================================

/// Build a proof and return its hex serialization.
///
/// Every stake is checked before the master keys are decoded.
#[instrument(skip_all, fields(sequence = params.sequence, stakes = params.stakes.len()))]
pub fn build_avalanche_proof(params: &BuildParams) -> Result<String, RpcError> {
    let checked = params
        .stakes
        .iter()
        .map(|param| -> Result<CheckedStake, RpcError> { Ok(param.to_descriptor()?.check()?) })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(stakes = checked.len(), "stake parameters accepted");

    let declared = CompressedPubKey::from_hex(&params.master)?;
    let signer = PrivateKey::from_hex(&params.masterprivkey)?;
    let builder =
        ProofBuilder::with_declared_master(params.sequence, params.expiration, signer, &declared)?;

    let proof = checked
        .into_iter()
        .try_fold(builder, ProofBuilder::add_checked)?
        .build()?;
    Ok(proof.to_hex())
}

/// Describe a serialized proof without verifying it.
pub fn decode_avalanche_proof(proof_hex: &str) -> Result<DecodedProof, RpcError> {
    let proof = Proof::from_hex(proof_hex)?;
    Ok(DecodedProof::from(&proof))
}

/// Run full validation at time `now`.
pub async fn verify_avalanche_proof(
    validator: &ProofValidator,
    proof_hex: &str,
    now: i64,
) -> Result<VerifyResult, RpcError> {
    let bytes = hex::decode(proof_hex.trim()).map_err(|e| {
        RpcError::new(RPC_DESERIALIZATION_ERROR, format!("malformed proof: invalid hex: {}", e))
    })?;
    let validated = validator.validate(&bytes, now).await?;
    Ok(VerifyResult {
        valid: true,
        proofid: validated.id().to_hex(),
        weight: validated.weight,
    })
}

// =============================================================================
// DISPATCH
// =============================================================================

/// A request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "lowercase")]
pub enum RpcRequest {
    /// Build a proof.
    BuildAvalancheProof(BuildParams),
    /// Decode a proof.
    DecodeAvalancheProof(ProofParam),
    /// Validate a proof.
    VerifyAvalancheProof(ProofParam),
}

impl RpcRequest {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A response envelope; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Method result.
    pub result: Option<serde_json::Value>,
    /// Method failure.
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn from_result(result: Result<serde_json::Value, RpcError>) -> Self {
        match result {
            Ok(value) => Self { result: Some(value), error: None },
            Err(error) => Self { result: None, error: Some(error) },
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Routes requests to the proof methods.
#[derive(Clone)]
pub struct RpcHandler {
    validator: ProofValidator,
}

impl RpcHandler {
    /// Create a handler backed by `validator`.
    pub fn new(validator: ProofValidator) -> Self {
        Self { validator }
    }

    /// Run one request.
    pub async fn dispatch(
        &self,
        request: RpcRequest,
        now: i64,
    ) -> Result<serde_json::Value, RpcError> {
        let value = match request {
            RpcRequest::BuildAvalancheProof(params) => {
                serde_json::Value::String(build_avalanche_proof(&params)?)
            }
            RpcRequest::DecodeAvalancheProof(param) => {
                to_value(&decode_avalanche_proof(&param.proof)?)?
            }
            RpcRequest::VerifyAvalancheProof(param) => {
                to_value(&verify_avalanche_proof(&self.validator, &param.proof, now).await?)?
            }
        };
        Ok(value)
    }

    /// Parse, run and wrap one JSON request.
    pub async fn handle_json(&self, json: &str, now: i64) -> RpcResponse {
        let request = match RpcRequest::from_json(json) {
            Ok(request) => request,
            Err(err) => return RpcResponse::from_result(Err(request_error(json, err))),
        };
        RpcResponse::from_result(self.dispatch(request, now).await)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(RPC_INTERNAL_ERROR, e.to_string()))
}

/// Unknown methods get their own code; everything else is a shape error.
fn request_error(json: &str, err: serde_json::Error) -> RpcError {
    let method = serde_json::from_str::<serde_json::Value>(json)
        .ok()
        .and_then(|v| v.get("method").and_then(|m| m.as_str()).map(str::to_owned));

    match method {
        Some(m)
            if !matches!(
                m.as_str(),
                "buildavalancheproof" | "decodeavalancheproof" | "verifyavalancheproof"
            ) =>
        {
            RpcError::new(RPC_METHOD_NOT_FOUND, format!("Method not found: {}", m))
        }
        _ => RpcError::from(err),
    }
}
