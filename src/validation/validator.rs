//! Proof Validator
//!
//! Validates proofs received from peers:
//! decode → structure → stake signatures → proof signature → expiry →
//! ledger confirmation → weight. Outcomes are cached by proof id, and
//! concurrent submissions of the same bytes share one validation run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join_all, FutureExt};
use tracing::{debug, info, instrument, warn};

use crate::core::hash::ProofId;
use crate::error::ProofError;
use crate::proof::encoding::{Proof, MAX_PROOF_STAKES};
use crate::proof::stake::{Amount, SignedStake};
use crate::proof::verify::{check_expiry, check_structure, verify_proof_signature, verify_stake_signatures};
use crate::validation::cache::{CacheStatus, ProofCache, SlotState};
use crate::validation::ledger::LedgerLookup;
use crate::validation::registry::ProofState;
use crate::validation::weight::{StakeWeight, WeightInput, WeightPolicy};

/// Validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Upper bound on a single ledger lookup.
    pub lookup_timeout: Duration,
    /// Settled proof outcomes kept in the cache.
    pub cache_capacity: usize,
    /// Largest stake count accepted; never above [`MAX_PROOF_STAKES`].
    pub max_stakes: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(5),
            cache_capacity: 10_000,
            max_stakes: MAX_PROOF_STAKES,
        }
    }
}

impl ValidatorConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lookup_timeout: std::env::var("AVAPROOF_LOOKUP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.lookup_timeout),
            cache_capacity: std::env::var("AVAPROOF_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_capacity),
            max_stakes: std::env::var("AVAPROOF_MAX_STAKES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|n| n.min(MAX_PROOF_STAKES))
                .unwrap_or(defaults.max_stakes),
        }
    }
}

/// An accepted proof and its weight.
#[derive(Clone, Debug)]
pub struct ValidatedProof {
    /// The proof.
    pub proof: Arc<Proof>,
    /// Weight assigned by the policy.
    pub weight: u64,
    /// Sum of confirmed stake amounts.
    pub total_amount: Amount,
}

impl ValidatedProof {
    /// Proof id.
    pub fn id(&self) -> ProofId {
        self.proof.id()
    }
}

type Outcome = Result<ValidatedProof, ProofError>;

/// Validation counters.
#[derive(Debug, Default)]
pub struct ValidatorStats {
    validations: AtomicU64,
    cache_hits: AtomicU64,
    coalesced: AtomicU64,
    signature_checks: AtomicU64,
}

/// Point-in-time copy of [`ValidatorStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Validation runs started.
    pub validations: u64,
    /// Requests answered from a settled cache entry.
    pub cache_hits: u64,
    /// Requests that joined an in-flight run.
    pub coalesced: u64,
    /// Schnorr verifications performed.
    pub signature_checks: u64,
}

impl ValidatorStats {
    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            validations: self.validations.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            signature_checks: self.signature_checks.load(Ordering::Relaxed),
        }
    }
}

/// Everything a validation run needs, shared with in-flight futures.
struct Pipeline {
    ledger: Arc<dyn LedgerLookup>,
    policy: Arc<dyn WeightPolicy>,
    config: ValidatorConfig,
    stats: ValidatorStats,
}

impl Pipeline {
    async fn run(self: Arc<Self>, id: ProofId, bytes: Arc<[u8]>, now: i64) -> Outcome {
        self.stats.validations.fetch_add(1, Ordering::Relaxed);

        let proof = Proof::from_bytes(&bytes)?;
        if proof.stakes().len() > self.config.max_stakes {
            return Err(ProofError::invalid_parameter("too many stakes"));
        }
        check_structure(&proof)?;

        self.stats
            .signature_checks
            .fetch_add(proof.stakes().len() as u64, Ordering::Relaxed);
        verify_stake_signatures(&proof)?;
        self.stats.signature_checks.fetch_add(1, Ordering::Relaxed);
        verify_proof_signature(&proof)?;

        check_expiry(&proof, now)?;
        self.confirm_stakes(&proof).await?;

        let input = WeightInput {
            total_amount: proof.total_amount(),
            stakes: proof
                .stakes()
                .iter()
                .map(|s| StakeWeight { amount: s.stake.amount, height: s.stake.height })
                .collect(),
        };
        let weight = self.policy.weight(&input);

        info!(proof_id = %id, sequence = proof.sequence(), weight, "proof accepted");
        Ok(ValidatedProof {
            proof: Arc::new(proof),
            weight,
            total_amount: input.total_amount,
        })
    }

    /// Look up every stake concurrently; report the first failure in stake order.
    async fn confirm_stakes(&self, proof: &Proof) -> Result<(), ProofError> {
        let checks = proof.stakes().iter().map(|signed| self.confirm_stake(signed));
        join_all(checks).await.into_iter().collect()
    }

    async fn confirm_stake(&self, signed: &SignedStake) -> Result<(), ProofError> {
        let outpoint = *signed.outpoint();
        let lookup = tokio::time::timeout(self.config.lookup_timeout, self.ledger.lookup(outpoint));

        match lookup.await {
            Err(_) => {
                warn!(%outpoint, "ledger lookup timed out");
                Err(ProofError::StakeNotFound(outpoint))
            }
            Ok(Err(err)) => {
                warn!(%outpoint, error = %err, "ledger lookup failed");
                Err(ProofError::StakeNotFound(outpoint))
            }
            Ok(Ok(None)) => Err(ProofError::StakeNotFound(outpoint)),
            Ok(Ok(Some(coin))) if coin.spent => Err(ProofError::StakeNotFound(outpoint)),
            Ok(Ok(Some(coin))) if !coin.matches(&signed.stake) => {
                debug!(%outpoint, ?coin, "ledger disagrees with stake");
                Err(ProofError::StakeMismatch(outpoint))
            }
            Ok(Ok(Some(_))) => Ok(()),
        }
    }
}

/// Async proof validator with a coalescing result cache.
#[derive(Clone)]
pub struct ProofValidator {
    pipeline: Arc<Pipeline>,
    cache: Arc<ProofCache<Outcome>>,
}

impl ProofValidator {
    /// Create a validator over a ledger and weight policy.
    pub fn new(
        ledger: Arc<dyn LedgerLookup>,
        policy: Arc<dyn WeightPolicy>,
        config: ValidatorConfig,
    ) -> Self {
        let cache = Arc::new(ProofCache::new(config.cache_capacity));
        Self {
            pipeline: Arc::new(Pipeline {
                ledger,
                policy,
                config,
                stats: ValidatorStats::default(),
            }),
            cache,
        }
    }

    /// Validate serialized proof bytes at time `now` (unix seconds).
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn validate(&self, bytes: &[u8], now: i64) -> Result<ValidatedProof, ProofError> {
        let id = ProofId::from_bytes(bytes);
        let bytes: Arc<[u8]> = Arc::from(bytes);
        let pipeline = self.pipeline.clone();

        let (outcome, status) = self
            .cache
            .get_or_validate(
                id,
                move || pipeline.run(id, bytes, now).boxed(),
                |outcome| match outcome {
                    Ok(_) => true,
                    Err(err) => err.is_permanent(),
                },
            )
            .await;

        match status {
            CacheStatus::Hit => {
                self.pipeline.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(proof_id = %id, "served from cache");
            }
            CacheStatus::Joined => {
                self.pipeline.stats.coalesced.fetch_add(1, Ordering::Relaxed);
            }
            CacheStatus::Miss => {}
        }

        if let Err(err) = &outcome {
            debug!(proof_id = %id, error = %err, "proof rejected");
        }

        // A settled or shared result may have been produced for another `now`.
        let validated = outcome?;
        check_expiry(&validated.proof, now)?;
        Ok(validated)
    }

    /// Validate an in-memory proof.
    pub async fn validate_proof(&self, proof: &Proof, now: i64) -> Result<ValidatedProof, ProofError> {
        self.validate(&proof.to_bytes(), now).await
    }

    /// Validate against the wall clock.
    pub async fn validate_now(&self, bytes: &[u8]) -> Result<ValidatedProof, ProofError> {
        self.validate(bytes, chrono::Utc::now().timestamp()).await
    }

    /// Where `id` is in the validation state machine.
    pub async fn status(&self, id: &ProofId) -> ProofState {
        match self.cache.slot_state(id).await {
            None => ProofState::Unseen,
            Some(SlotState::Pending) => ProofState::Validating,
            Some(SlotState::Ready(Ok(_))) => ProofState::Valid,
            Some(SlotState::Ready(Err(_))) => ProofState::Invalid,
        }
    }

    /// Drop a cached outcome so the next submission validates again.
    pub async fn forget(&self, id: &ProofId) -> bool {
        self.cache.forget(id).await
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.pipeline.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::PrivateKey;
    use crate::error::ErrorKind;
    use crate::proof::builder::build_proof;
    use crate::proof::stake::StakeDescriptor;
    use crate::validation::ledger::{Coin, MemoryLedger};
    use crate::validation::weight::AmountWeight;

    fn descriptor(vout: i64) -> StakeDescriptor {
        StakeDescriptor {
            txid: [0x30; 32],
            vout,
            amount: Some(1_000 * (vout + 1)),
            height: 100,
            is_coinbase: false,
            private_key: "71".repeat(32),
        }
    }

    fn proof(sequence: u64, expiration: i64) -> Proof {
        let master = PrivateKey::from_bytes(&[0x70; 32]).unwrap();
        build_proof(sequence, expiration, master, &[descriptor(0), descriptor(1)]).unwrap()
    }

    async fn setup(proof: &Proof) -> (ProofValidator, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.insert_matching(proof.stakes().iter().map(|s| &s.stake)).await;
        let validator = ProofValidator::new(
            ledger.clone(),
            Arc::new(AmountWeight::default()),
            ValidatorConfig::default(),
        );
        (validator, ledger)
    }

    #[tokio::test]
    async fn test_accepts_confirmed_proof() {
        let p = proof(0, 0);
        let (validator, _) = setup(&p).await;

        let validated = validator.validate(&p.to_bytes(), 1_700_000_000).await.unwrap();
        assert_eq!(validated.id(), p.id());
        assert_eq!(validated.total_amount, 3_000);
        assert_eq!(validated.weight, 3_000);
        assert_eq!(validator.status(&p.id()).await, ProofState::Valid);
    }

    #[tokio::test]
    async fn test_resubmission_skips_crypto() {
        let p = proof(0, 0);
        let (validator, ledger) = setup(&p).await;
        let bytes = p.to_bytes();

        validator.validate(&bytes, 0).await.unwrap();
        let first = validator.stats();
        assert_eq!(first.signature_checks, 3);

        validator.validate(&bytes, 0).await.unwrap();
        let second = validator.stats();
        assert_eq!(second.signature_checks, first.signature_checks);
        assert_eq!(second.validations, 1);
        assert_eq!(second.cache_hits, 1);
        assert_eq!(ledger.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_bytes_cached() {
        let p = proof(0, 0);
        let (validator, _) = setup(&p).await;
        let mut bytes = p.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        for _ in 0..3 {
            let err = validator.validate(&bytes, 0).await.unwrap_err();
            assert_eq!(err, ProofError::InvalidProofSignature);
        }
        assert_eq!(validator.stats().validations, 1);
        assert_eq!(validator.status(&ProofId::from_bytes(&bytes)).await, ProofState::Invalid);
    }

    #[tokio::test]
    async fn test_malformed_bytes() {
        let p = proof(0, 0);
        let (validator, _) = setup(&p).await;

        let err = validator.validate(&[1, 2, 3], 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedProof);
        validator.validate(&[1, 2, 3], 0).await.unwrap_err();
        assert_eq!(validator.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_expiry_uses_caller_time() {
        let p = proof(0, 2_000);
        let (validator, _) = setup(&p).await;
        let bytes = p.to_bytes();

        let err = validator.validate(&bytes, 2_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpiredProof);
        assert_eq!(validator.status(&p.id()).await, ProofState::Unseen);

        validator.validate(&bytes, 1_999).await.unwrap();
        // Settled acceptance still honours a later clock.
        let err = validator.validate(&bytes, 2_001).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpiredProof);
        assert_eq!(validator.stats().validations, 2);
    }

    #[tokio::test]
    async fn test_ledger_failures_not_cached() {
        let p = proof(0, 0);
        let ledger = Arc::new(MemoryLedger::new());
        let validator = ProofValidator::new(
            ledger.clone(),
            Arc::new(AmountWeight::default()),
            ValidatorConfig::default(),
        );
        let bytes = p.to_bytes();
        let first = p.stakes()[0].stake;
        let second = p.stakes()[1].stake;

        let err = validator.validate(&bytes, 0).await.unwrap_err();
        assert_eq!(err, ProofError::StakeNotFound(first.outpoint));

        ledger.insert(first.outpoint, Coin::matching(&first)).await;
        ledger.insert(second.outpoint, Coin::unspent(second.amount + 1, second.height, false)).await;
        let err = validator.validate(&bytes, 0).await.unwrap_err();
        assert_eq!(err, ProofError::StakeMismatch(second.outpoint));

        ledger.insert(second.outpoint, Coin::matching(&second)).await;
        validator.validate(&bytes, 0).await.unwrap();

        ledger.spend(&first.outpoint).await;
        // Accepted proofs stay cached until forgotten.
        validator.validate(&bytes, 0).await.unwrap();
        assert!(validator.forget(&p.id()).await);
        let err = validator.validate(&bytes, 0).await.unwrap_err();
        assert_eq!(err, ProofError::StakeNotFound(first.outpoint));
    }

    #[tokio::test]
    async fn test_lookup_timeout_is_not_found() {
        let p = proof(0, 0);
        let ledger = Arc::new(MemoryLedger::with_delay(Duration::from_millis(200)));
        ledger.insert_matching(p.stakes().iter().map(|s| &s.stake)).await;
        let config = ValidatorConfig {
            lookup_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let validator = ProofValidator::new(ledger, Arc::new(AmountWeight::default()), config);

        let err = validator.validate(&p.to_bytes(), 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StakeNotFound);
    }

    #[tokio::test]
    async fn test_concurrent_validation_coalesces() {
        let p = proof(5, 0);
        let ledger = Arc::new(MemoryLedger::with_delay(Duration::from_millis(50)));
        ledger.insert_matching(p.stakes().iter().map(|s| &s.stake)).await;
        let validator = ProofValidator::new(
            ledger.clone(),
            Arc::new(AmountWeight::default()),
            ValidatorConfig::default(),
        );
        let bytes = p.to_bytes();

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let validator = validator.clone();
                let bytes = bytes.clone();
                tokio::spawn(async move { validator.validate(&bytes, 0).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().id(), p.id());
        }

        let stats = validator.stats();
        assert_eq!(stats.validations, 1);
        assert_eq!(stats.signature_checks, 3);
        assert_eq!(stats.coalesced + stats.cache_hits, 5);
        assert_eq!(ledger.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_policy() {
        let p = proof(0, 0);
        let ledger = Arc::new(MemoryLedger::new());
        ledger.insert_matching(p.stakes().iter().map(|s| &s.stake)).await;
        let policy = |input: &WeightInput| input.stakes.len() as u64 * 10;
        let validator = ProofValidator::new(ledger, Arc::new(policy), ValidatorConfig::default());

        assert_eq!(validator.validate_proof(&p, 0).await.unwrap().weight, 20);
    }

    #[test]
    fn test_config_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.lookup_timeout, Duration::from_secs(5));
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.max_stakes, MAX_PROOF_STAKES);
    }

    #[tokio::test]
    async fn test_stake_limit() {
        let p = proof(0, 0);
        let ledger = Arc::new(MemoryLedger::new());
        ledger.insert_matching(p.stakes().iter().map(|s| &s.stake)).await;
        let config = ValidatorConfig { max_stakes: 1, ..Default::default() };
        let validator = ProofValidator::new(ledger, Arc::new(AmountWeight::default()), config);

        let err = validator.validate_proof(&p, 0).await.unwrap_err();
        assert_eq!(err, ProofError::invalid_parameter("too many stakes"));
        assert_eq!(validator.stats().signature_checks, 0);
    }
}
