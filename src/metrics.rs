//! Fetch latency and outcome metrics
//!
//! Tracks a rolling window of fetch latencies plus lifetime success counts for
//! the source behind a controller.

use crate::constants::METRICS_WINDOW;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Snapshot of fetch metrics for one source
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMetrics {
    /// Name of the source
    pub source_name: String,
    /// 50th percentile latency of successful fetches in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful fetches in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of fetches tracked
    pub total_fetches: u64,
    /// Number of failed fetches
    pub failed_fetches: u64,
}

impl FetchMetrics {
    /// Creates metrics with no data
    pub fn empty(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_fetches: 0,
            failed_fetches: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total: u64,
    failed: u64,
}

/// Collects and computes fetch metrics
pub struct MetricsCollector {
    source_name: String,
    inner: RwLock<Counters>,
}

impl MetricsCollector {
    /// Creates a new metrics collector for a source
    pub fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            inner: RwLock::new(Counters {
                samples: VecDeque::with_capacity(METRICS_WINDOW),
                ..Counters::default()
            }),
        }
    }

    /// Records a fetch with its duration and outcome
    pub async fn record_fetch(&self, duration: Duration, success: bool) {
        let mut inner = self.inner.write().await;

        inner.total += 1;
        if !success {
            inner.failed += 1;
        }

        if inner.samples.len() >= METRICS_WINDOW {
            inner.samples.pop_front();
        }
        inner.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> FetchMetrics {
        let inner = self.inner.read().await;

        if inner.samples.is_empty() {
            return FetchMetrics::empty(&self.source_name);
        }

        let mut latencies: Vec<f64> = inner
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if inner.total > 0 {
            (inner.total - inner.failed) as f64 / inner.total as f64
        } else {
            1.0
        };

        FetchMetrics {
            source_name: self.source_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_fetches: inner.total,
            failed_fetches: inner.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new("test");

        collector.record_fetch(Duration::from_millis(100), true).await;
        collector.record_fetch(Duration::from_millis(200), true).await;
        collector.record_fetch(Duration::from_millis(150), false).await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.source_name, "test");
        assert_eq!(metrics.total_fetches, 3);
        assert_eq!(metrics.failed_fetches, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
        assert!(metrics.latency_p99_ms >= 199.0);
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let collector = MetricsCollector::new("test");
        for _ in 0..(METRICS_WINDOW + 20) {
            collector.record_fetch(Duration::from_millis(5), true).await;
        }

        assert_eq!(collector.inner.read().await.samples.len(), METRICS_WINDOW);
        assert_eq!(
            collector.get_metrics().await.total_fetches,
            (METRICS_WINDOW + 20) as u64
        );
    }

    #[tokio::test]
    async fn test_empty_metrics() {
        let metrics = MetricsCollector::new("fixture").get_metrics().await;
        assert_eq!(metrics, FetchMetrics::empty("fixture"));
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 9.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
