//! Observable coin list state
//!
//! The state lives behind a `tokio::sync::watch` channel. Every write is a
//! single `send_modify`, so readers always see a whole list together with the
//! error and phase that belong to it.

use crate::{
    error::FetchError,
    types::{Coin, LoadPhase, RefreshPolicy},
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of the published coin list
#[derive(Debug, Clone, Default)]
pub struct CoinListState {
    /// Coins in upstream order
    pub coins: Arc<Vec<Coin>>,

    /// Number of fetches currently running
    pub in_flight: usize,

    /// Generation of the fetch that produced `coins` (0 before the first success)
    pub generation: u64,

    /// Error of the most recent failed fetch, cleared by the next published list
    pub last_error: Option<FetchError>,

    /// When `coins` was published
    pub last_updated: Option<DateTime<Utc>>,
}

impl CoinListState {
    pub fn phase(&self) -> LoadPhase {
        if self.in_flight > 0 {
            LoadPhase::Loading
        } else {
            LoadPhase::Idle
        }
    }

    /// Looks up a coin by id, for detail views
    pub fn coin(&self, id: &str) -> Option<&Coin> {
        self.coins.iter().find(|coin| coin.id == id)
    }
}

/// Result of completing a fetch against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The state now reflects this fetch
    Applied,
    /// A newer fetch was already published; this one only left the in-flight set
    Stale { published_generation: u64 },
}

/// Single-writer store for the coin list
pub struct CoinStore {
    state: watch::Sender<CoinListState>,
    policy: RefreshPolicy,
    next_generation: AtomicU64,
}

impl CoinStore {
    /// Creates an empty store
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            state: watch::Sender::new(CoinListState::default()),
            policy,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Clones the current state
    pub fn snapshot(&self) -> CoinListState {
        self.state.borrow().clone()
    }

    /// Current coin list without cloning the coins
    pub fn coins(&self) -> Arc<Vec<Coin>> {
        Arc::clone(&self.state.borrow().coins)
    }

    /// Returns a receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<CoinListState> {
        self.state.subscribe()
    }

    /// Registers a fetch and assigns its generation
    ///
    /// The returned guard must be completed with `publish_coins` or
    /// `record_failure`; dropping it just removes the fetch from the
    /// in-flight count.
    pub fn begin_fetch(&self) -> InFlight<'_> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| state.in_flight += 1);

        InFlight {
            store: self,
            generation,
            armed: true,
        }
    }

    fn is_stale(&self, generation: u64, state: &CoinListState) -> bool {
        self.policy == RefreshPolicy::DiscardStale && generation < state.generation
    }
}

impl Default for CoinStore {
    fn default() -> Self {
        Self::new(RefreshPolicy::default())
    }
}

/// A fetch registered with the store
pub struct InFlight<'a> {
    store: &'a CoinStore,
    generation: u64,
    armed: bool,
}

impl InFlight<'_> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the published list wholesale, unless a newer one is already out
    pub fn publish_coins(self, coins: Vec<Coin>) -> PublishOutcome {
        let store = self.store;
        let generation = self.generation;

        self.complete(|state| {
            if store.is_stale(generation, state) {
                return PublishOutcome::Stale {
                    published_generation: state.generation,
                };
            }

            state.coins = Arc::new(coins);
            state.generation = generation;
            state.last_error = None;
            state.last_updated = Some(Utc::now());
            PublishOutcome::Applied
        })
    }

    /// Records a failed fetch, leaving the published list untouched
    pub fn record_failure(self, error: FetchError) -> PublishOutcome {
        let store = self.store;
        let generation = self.generation;

        self.complete(|state| {
            if store.is_stale(generation, state) {
                return PublishOutcome::Stale {
                    published_generation: state.generation,
                };
            }

            state.last_error = Some(error);
            PublishOutcome::Applied
        })
    }

    fn complete(
        mut self,
        apply: impl FnOnce(&mut CoinListState) -> PublishOutcome,
    ) -> PublishOutcome {
        self.armed = false;

        let mut outcome = PublishOutcome::Applied;
        self.store.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            outcome = apply(state);
        });
        outcome
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store
                .state
                .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
        }
    }
}
