//! Proof Validation
//!
//! Async acceptance of proofs received from peers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    VALIDATION                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  validator.rs    - Pipeline, config, counters               │
//! │  cache.rs        - Keyed future-cache (coalescing)          │
//! │  ledger.rs       - UTXO lookup trait + in-memory ledger     │
//! │  weight.rs       - Injected weight policies                 │
//! │  registry.rs     - Current proof per master, supersession   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod ledger;
pub mod registry;
pub mod validator;
pub mod weight;

pub use cache::{CacheStatus, ProofCache, SlotState};
pub use ledger::{Coin, LedgerError, LedgerLookup, MemoryLedger};
pub use registry::{Offer, PeerProofs, ProofState};
pub use validator::{ProofValidator, StatsSnapshot, ValidatedProof, ValidatorConfig, ValidatorStats};
pub use weight::{AmountWeight, MaturityWeight, StakeWeight, WeightInput, WeightPolicy};
