//! Coin list controller
//!
//! Owns the observable coin list and mediates fetches against a
//! [`MarketDataSource`]. Construction is inert; the owner calls
//! [`CoinListController::initialize`] to populate the list.

use crate::{
    constants::EVENT_CHANNEL_CAPACITY,
    error::FetchError,
    metrics::{FetchMetrics, MetricsCollector},
    source::MarketDataSource,
    store::{CoinListState, CoinStore, PublishOutcome},
    types::{Coin, CoinListEvent, ComponentHealth, HealthStatus, LoadPhase, RefreshPolicy},
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// `error_kind` of a `FetchFailed` event whose fetch task panicked or was aborted
pub const TASK_FAILED: &str = "task_failed";

/// Coin list controller
///
/// Each fetch runs on a spawned task; only the final state write happens on
/// the task that called `load`/`refresh`, in one atomic replacement. Fetch
/// failures never reach the caller: the list stays as it was and the error is
/// logged, stored in [`CoinListState::last_error`] and broadcast as
/// [`CoinListEvent::FetchFailed`].
///
/// # Example
/// ```no_run
/// use coin_market_sdk::{CoinGeckoSource, CoinListController};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let controller = CoinListController::new(Arc::new(CoinGeckoSource::new()?));
/// controller.initialize().await;
///
/// for coin in controller.coins().iter() {
///     println!("{}: ${:.2}", coin.display_symbol(), coin.current_price);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CoinListController {
    source: Arc<dyn MarketDataSource>,
    store: CoinStore,
    events: broadcast::Sender<CoinListEvent>,
    metrics: MetricsCollector,
    initialized: AtomicBool,
}

impl CoinListController {
    /// Creates a controller with the default refresh policy
    ///
    /// Performs no I/O and spawns nothing.
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self::with_policy(source, RefreshPolicy::default())
    }

    /// Creates a controller with an explicit overlap policy
    pub fn with_policy(source: Arc<dyn MarketDataSource>, policy: RefreshPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let metrics = MetricsCollector::new(source.source_name());

        Self {
            source,
            store: CoinStore::new(policy),
            events,
            metrics,
            initialized: AtomicBool::new(false),
        }
    }

    /// Performs the initial load
    ///
    /// Only the first call fetches; later calls return immediately.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("Coin list controller already initialized");
            return;
        }

        tracing::info!(
            source = self.source.source_name(),
            policy = ?self.store.policy(),
            "Initializing coin list controller"
        );
        self.run_fetch("initialize").await;
    }

    /// Fetches the coin list and publishes it on success
    pub async fn load(&self) {
        self.run_fetch("load").await;
    }

    /// Re-fetches the coin list; same semantics as [`load`](Self::load)
    pub async fn refresh(&self) {
        self.run_fetch("refresh").await;
    }

    /// Starts a refresh without waiting for it
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.refresh().await })
    }

    async fn run_fetch(&self, trigger: &'static str) {
        let in_flight = self.store.begin_fetch();
        let generation = in_flight.generation();

        tracing::debug!(
            generation,
            trigger,
            source = self.source.source_name(),
            "Fetching coin list"
        );

        let source = Arc::clone(&self.source);
        let start = Instant::now();
        let fetched = tokio::spawn(async move { source.fetch_coins().await }).await;
        let elapsed = start.elapsed();

        match fetched {
            Ok(Ok(coins)) => {
                self.metrics.record_fetch(elapsed, true).await;
                let count = coins.len();

                match in_flight.publish_coins(coins) {
                    PublishOutcome::Applied => {
                        tracing::info!(
                            generation,
                            trigger,
                            count,
                            latency_ms = elapsed.as_millis() as u64,
                            "Published coin list"
                        );
                        self.emit(CoinListEvent::CoinsUpdated {
                            id: Uuid::new_v4(),
                            generation,
                            count,
                            timestamp: Utc::now(),
                        });
                    }
                    PublishOutcome::Stale {
                        published_generation,
                    } => {
                        tracing::debug!(
                            generation,
                            published_generation,
                            "Discarding stale coin list response"
                        );
                        self.emit(CoinListEvent::StaleResponseDiscarded {
                            id: Uuid::new_v4(),
                            generation,
                            published_generation,
                            timestamp: Utc::now(),
                        });
                    }
                }
            }
            Ok(Err(error)) => {
                self.metrics.record_fetch(elapsed, false).await;
                tracing::warn!(
                    generation,
                    trigger,
                    kind = error.kind(),
                    error = %error,
                    "Failed to fetch coin list"
                );
                let outcome = in_flight.record_failure(error.clone());
                if let PublishOutcome::Stale {
                    published_generation,
                } = outcome
                {
                    tracing::debug!(
                        generation,
                        published_generation,
                        "Newer coin list already published, error not recorded"
                    );
                }
                self.report_failure(generation, &error);
            }
            Err(join_error) => {
                self.metrics.record_fetch(elapsed, false).await;
                tracing::error!(
                    generation,
                    trigger,
                    error = %join_error,
                    "Coin list fetch task did not complete"
                );
                drop(in_flight);
                self.emit(CoinListEvent::FetchFailed {
                    id: Uuid::new_v4(),
                    generation,
                    error_kind: TASK_FAILED.to_string(),
                    error_message: join_error.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn report_failure(&self, generation: u64, error: &FetchError) {
        self.emit(CoinListEvent::FetchFailed {
            id: Uuid::new_v4(),
            generation,
            error_kind: error.kind().to_string(),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn emit(&self, event: CoinListEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Current coin list, in upstream order
    pub fn coins(&self) -> Arc<Vec<Coin>> {
        self.store.coins()
    }

    /// Looks up a coin of the current list by id
    pub fn coin(&self, id: &str) -> Option<Coin> {
        self.store.snapshot().coin(id).cloned()
    }

    /// Full snapshot of the observable state
    pub fn state(&self) -> CoinListState {
        self.store.snapshot()
    }

    pub fn phase(&self) -> LoadPhase {
        self.store.snapshot().phase()
    }

    /// Error of the most recent failed fetch, if not superseded by a success
    pub fn last_error(&self) -> Option<FetchError> {
        self.store.snapshot().last_error
    }

    /// Receiver notified whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<CoinListState> {
        self.store.subscribe()
    }

    /// Receiver for coin list events
    pub fn subscribe_events(&self) -> broadcast::Receiver<CoinListEvent> {
        self.events.subscribe()
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.store.policy()
    }

    /// Returns the name of the underlying source
    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Gets fetch metrics including latency percentiles and success rate
    pub async fn fetch_metrics(&self) -> FetchMetrics {
        self.metrics.get_metrics().await
    }

    /// Perform a health check on the controller
    ///
    /// # Returns
    /// Unhealthy with no published list, Degraded when the last fetch failed,
    /// Healthy otherwise
    pub async fn health_check(&self) -> ComponentHealth {
        let state = self.state();
        let metrics = self.fetch_metrics().await;
        let mut details = HashMap::new();

        details.insert("coin_count".to_string(), serde_json::json!(state.coins.len()));
        details.insert(
            "source_name".to_string(),
            serde_json::json!(self.source_name()),
        );
        details.insert("generation".to_string(), serde_json::json!(state.generation));
        details.insert(
            "success_rate".to_string(),
            serde_json::json!(metrics.success_rate),
        );
        details.insert(
            "last_error".to_string(),
            serde_json::json!(state.last_error.as_ref().map(|e| e.to_string())),
        );

        let status = if state.coins.is_empty() {
            HealthStatus::Unhealthy
        } else if state.last_error.is_some() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => format!("Coin list has {} coins", state.coins.len()),
            HealthStatus::Degraded => format!(
                "Coin list has {} coins but the last fetch failed",
                state.coins.len()
            ),
            HealthStatus::Unhealthy => "Coin list is empty".to_string(),
        };

        ComponentHealth {
            name: "coin_list_controller".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FixtureSource;
    use std::time::Duration;

    fn coin(id: &str) -> Coin {
        Coin::new(id, id, id, format!("https://example.com/{}.png", id), 1.0)
    }

    fn coins(ids: &[&str]) -> Vec<Coin> {
        ids.iter().map(|id| coin(id)).collect()
    }

    fn ids(controller: &CoinListController) -> Vec<String> {
        controller.coins().iter().map(|c| c.id.clone()).collect()
    }

    fn controller_with(source: &Arc<FixtureSource>) -> CoinListController {
        CoinListController::new(source.clone())
    }

    #[tokio::test]
    async fn test_new_is_inert() {
        let source = Arc::new(FixtureSource::new(coins(&["bitcoin"])));
        let controller = controller_with(&source);

        assert_eq!(source.call_count(), 0);
        assert!(controller.coins().is_empty());
        assert_eq!(controller.phase(), LoadPhase::Idle);
        assert_eq!(controller.last_error(), None);
        assert_eq!(controller.policy(), RefreshPolicy::DiscardStale);
    }

    #[tokio::test]
    async fn test_initialize_fetches_once() {
        let source = Arc::new(FixtureSource::new(coins(&["bitcoin", "ethereum"])));
        let controller = controller_with(&source);

        controller.initialize().await;
        controller.initialize().await;

        assert_eq!(source.call_count(), 1);
        assert_eq!(ids(&controller), vec!["bitcoin", "ethereum"]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_whole_list() {
        let source = Arc::new(FixtureSource::new(coins(&["a", "b"])));
        let controller = controller_with(&source);

        controller.load().await;
        assert_eq!(ids(&controller), vec!["a", "b"]);

        source.set_coins(coins(&["c"]));
        controller.refresh().await;

        assert_eq!(ids(&controller), vec!["c"]);
        assert_eq!(controller.state().generation, 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_list() {
        let source = Arc::new(FixtureSource::new(coins(&["a", "b"])));
        let controller = controller_with(&source);
        controller.load().await;
        let before = controller.coins();

        source.set_error(FetchError::bad_status(503));
        let mut events = controller.subscribe_events();
        controller.refresh().await;

        assert_eq!(controller.coins(), before);
        assert_eq!(controller.last_error(), Some(FetchError::bad_status(503)));

        match events.try_recv().unwrap() {
            CoinListEvent::FetchFailed {
                generation,
                error_kind,
                ..
            } => {
                assert_eq!(generation, 2);
                assert_eq!(error_kind, "bad_response");
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let source = Arc::new(FixtureSource::failing(FetchError::decode("bad shape")));
        let controller = controller_with(&source);

        controller.load().await;
        assert!(controller.coins().is_empty());
        assert_eq!(controller.last_error().map(|e| e.kind()), Some("decode_error"));

        source.set_coins(coins(&["a"]));
        controller.refresh().await;
        assert_eq!(controller.last_error(), None);
        assert_eq!(ids(&controller), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_is_loading_while_fetching() {
        let source = Arc::new(FixtureSource::default());
        source.push_delayed(Duration::from_millis(100), Ok(coins(&["a"])));
        let controller = Arc::new(controller_with(&source));

        let handle = controller.spawn_refresh();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.phase(), LoadPhase::Loading);

        handle.await.unwrap();
        assert_eq!(controller.phase(), LoadPhase::Idle);
        assert_eq!(ids(&controller), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refresh_discards_stale_response() {
        let source = Arc::new(FixtureSource::default());
        source.push_delayed(Duration::from_millis(150), Ok(coins(&["old"])));
        source.push(Ok(coins(&["new"])));
        let controller = controller_with(&source);
        let mut events = controller.subscribe_events();

        futures::join!(controller.load(), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            controller.refresh().await;
        });

        assert_eq!(ids(&controller), vec!["new"]);
        assert_eq!(controller.state().generation, 2);
        assert_eq!(events.try_recv().unwrap().event_type(), "COINS_UPDATED");
        assert_eq!(
            events.try_recv().unwrap().event_type(),
            "STALE_RESPONSE_DISCARDED"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refresh_last_write_wins() {
        let source = Arc::new(FixtureSource::default());
        source.push_delayed(Duration::from_millis(150), Ok(coins(&["old"])));
        source.push(Ok(coins(&["new"])));
        let controller =
            CoinListController::with_policy(source.clone(), RefreshPolicy::LastWriteWins);

        futures::join!(controller.load(), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            controller.refresh().await;
        });

        assert_eq!(ids(&controller), vec!["old"]);
        assert_eq!(controller.state().generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_load_leaves_in_flight() {
        let source = Arc::new(FixtureSource::default());
        source.push_delayed(Duration::from_millis(200), Ok(coins(&["a"])));
        let controller = controller_with(&source);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), controller.load()).await;
        assert!(timed_out.is_err());

        let state = controller.state();
        assert_eq!(state.in_flight, 0);
        assert!(state.coins.is_empty());
    }

    struct PanickingSource;

    #[async_trait::async_trait]
    impl MarketDataSource for PanickingSource {
        async fn fetch_coins(&self) -> Result<Vec<Coin>, FetchError> {
            panic!("upstream client bug");
        }

        fn source_name(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_panicked_fetch_is_reported() {
        let controller = CoinListController::new(Arc::new(PanickingSource));
        let mut events = controller.subscribe_events();

        controller.load().await;

        let state = controller.state();
        assert_eq!(state.in_flight, 0);
        assert!(state.coins.is_empty());
        assert_eq!(state.last_error, None);

        match events.try_recv().unwrap() {
            CoinListEvent::FetchFailed {
                generation,
                error_kind,
                ..
            } => {
                assert_eq!(generation, 1);
                assert_eq!(error_kind, TASK_FAILED);
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        assert_eq!(controller.fetch_metrics().await.failed_fetches, 1);
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let source = Arc::new(FixtureSource::new(coins(&["a", "b"])));
        let controller = controller_with(&source);
        let mut rx = controller.subscribe();

        controller.load().await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().coins.len(), 2);
        assert_eq!(controller.coin("b").map(|c| c.id), Some("b".to_string()));
        assert!(controller.coin("z").is_none());
    }

    #[tokio::test]
    async fn test_health_check_and_metrics() {
        let source = Arc::new(FixtureSource::new(coins(&["a"])));
        let controller = controller_with(&source);
        assert_eq!(controller.health_check().await.status, HealthStatus::Unhealthy);

        controller.load().await;
        assert_eq!(controller.health_check().await.status, HealthStatus::Healthy);

        source.set_error(FetchError::bad_status(500));
        controller.refresh().await;

        let health = controller.health_check().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.details["coin_count"], serde_json::json!(1));
        assert_eq!(health.details["source_name"], serde_json::json!("fixture"));

        let metrics = controller.fetch_metrics().await;
        assert_eq!(metrics.total_fetches, 2);
        assert_eq!(metrics.failed_fetches, 1);
    }
}
