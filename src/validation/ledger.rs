//! Ledger Lookup
//!
//! The UTXO set is an external collaborator. Validation only asks it
//! whether an outpoint exists, is unspent, and what it records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::proof::stake::{Amount, Outpoint, Stake};

/// What the ledger records for an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coin {
    /// Output value.
    pub amount: Amount,
    /// Creation height.
    pub height: u32,
    /// Created by a coinbase transaction.
    pub is_coinbase: bool,
    /// Already spent.
    pub spent: bool,
}

impl Coin {
    /// Unspent coin.
    pub fn unspent(amount: Amount, height: u32, is_coinbase: bool) -> Self {
        Self { amount, height, is_coinbase, spent: false }
    }

    /// Coin recording exactly what `stake` claims.
    pub fn matching(stake: &Stake) -> Self {
        Self::unspent(stake.amount, stake.height, stake.is_coinbase)
    }

    /// Whether the ledger agrees with the claim.
    pub fn matches(&self, stake: &Stake) -> bool {
        self.amount == stake.amount
            && self.height == stake.height
            && self.is_coinbase == stake.is_coinbase
    }
}

/// Ledger access failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Backing store could not answer.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the UTXO set.
pub trait LedgerLookup: Send + Sync {
    /// Look up an outpoint. `Ok(None)` when the ledger never saw it.
    fn lookup(&self, outpoint: Outpoint) -> BoxFuture<'_, Result<Option<Coin>, LedgerError>>;
}

/// In-memory ledger for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    coins: RwLock<HashMap<Outpoint, Coin>>,
    delay: Option<Duration>,
    lookups: AtomicU64,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger that answers every lookup after `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Record an output.
    pub async fn insert(&self, outpoint: Outpoint, coin: Coin) {
        self.coins.write().await.insert(outpoint, coin);
    }

    /// Record every stake of a proof exactly as claimed.
    pub async fn insert_matching<'a, I>(&self, stakes: I)
    where
        I: IntoIterator<Item = &'a Stake>,
    {
        let mut coins = self.coins.write().await;
        for stake in stakes {
            coins.insert(stake.outpoint, Coin::matching(stake));
        }
    }

    /// Mark an output spent. Returns false if it is unknown.
    pub async fn spend(&self, outpoint: &Outpoint) -> bool {
        match self.coins.write().await.get_mut(outpoint) {
            Some(coin) => {
                coin.spent = true;
                true
            }
            None => false,
        }
    }

    /// Lookups served so far.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl LedgerLookup for MemoryLedger {
    fn lookup(&self, outpoint: Outpoint) -> BoxFuture<'_, Result<Option<Coin>, LedgerError>> {
        async move {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.coins.read().await.get(&outpoint).copied())
        }
        .boxed()
    }
}
