//! Proof Cache
//!
//! Memoizes validation outcomes by proof id and coalesces concurrent
//! requests: the first caller for an unseen id installs a shared future,
//! later callers await that same future. The map lock is never held
//! across an await, so distinct ids validate in parallel.

use std::collections::{HashMap, VecDeque};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::core::hash::ProofId;

/// How a lookup was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No entry; this caller ran the validation.
    Miss,
    /// Settled entry returned without running anything.
    Hit,
    /// Joined a validation already in flight.
    Joined,
}

/// Observable state of one id.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState<V> {
    /// Validation in flight.
    Pending,
    /// Settled value.
    Ready(V),
}

enum Slot<V: Clone> {
    Pending {
        generation: u64,
        future: Shared<BoxFuture<'static, V>>,
    },
    Ready(V),
}

struct CacheState<V: Clone> {
    slots: HashMap<ProofId, Slot<V>>,
    settled: VecDeque<ProofId>,
    next_generation: u64,
}

/// Keyed future-cache.
pub struct ProofCache<V: Clone> {
    state: Mutex<CacheState<V>>,
    capacity: usize,
}

impl<V> ProofCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache keeping at most `capacity` settled entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                settled: VecDeque::new(),
                next_generation: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Return the settled value for `id`, join its in-flight validation,
    /// or start one with `validate`.
    ///
    /// Once the validation finishes, its value is kept if `retain`
    /// accepts it; otherwise the slot is cleared so the next request
    /// runs again.
    pub async fn get_or_validate<F, R>(&self, id: ProofId, validate: F, retain: R) -> (V, CacheStatus)
    where
        F: FnOnce() -> BoxFuture<'static, V>,
        R: Fn(&V) -> bool,
    {
        let (generation, future, status) = {
            let mut state = self.state.lock().await;
            match state.slots.get(&id) {
                Some(Slot::Ready(value)) => return (value.clone(), CacheStatus::Hit),
                Some(Slot::Pending { generation, future }) => {
                    (*generation, future.clone(), CacheStatus::Joined)
                }
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    let future = validate().shared();
                    state.slots.insert(
                        id,
                        Slot::Pending { generation, future: future.clone() },
                    );
                    (generation, future, CacheStatus::Miss)
                }
            }
        };

        let value = future.await;

        let mut state = self.state.lock().await;
        let ours = matches!(
            state.slots.get(&id),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );
        if ours {
            if retain(&value) {
                state.slots.insert(id, Slot::Ready(value.clone()));
                state.settled.push_back(id);
                self.evict(&mut state);
            } else {
                state.slots.remove(&id);
            }
        }

        (value, status)
    }

    fn evict(&self, state: &mut CacheState<V>) {
        while state.settled.len() > self.capacity {
            let Some(oldest) = state.settled.pop_front() else {
                break;
            };
            if matches!(state.slots.get(&oldest), Some(Slot::Ready(_))) {
                state.slots.remove(&oldest);
            }
        }
    }

    /// Settled value for `id`, if any.
    pub async fn get(&self, id: &ProofId) -> Option<V> {
        match self.state.lock().await.slots.get(id) {
            Some(Slot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// State of `id`; `None` when unseen or evicted.
    pub async fn slot_state(&self, id: &ProofId) -> Option<SlotState<V>> {
        match self.state.lock().await.slots.get(id) {
            Some(Slot::Pending { .. }) => Some(SlotState::Pending),
            Some(Slot::Ready(value)) => Some(SlotState::Ready(value.clone())),
            None => None,
        }
    }

    /// Drop a settled entry. In-flight validations are left alone.
    pub async fn forget(&self, id: &ProofId) -> bool {
        let mut state = self.state.lock().await;
        if matches!(state.slots.get(id), Some(Slot::Ready(_))) {
            state.slots.remove(id);
            state.settled.retain(|settled| settled != id);
            true
        } else {
            false
        }
    }

    /// Number of tracked ids, settled or pending.
    pub async fn len(&self) -> usize {
        self.state.lock().await.slots.len()
    }

    /// Whether nothing is tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
