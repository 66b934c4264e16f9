//! Metrics Recorder - Aggregation Service Observability
//!
//! Registers Prometheus metrics under the `dexfeed_*` namespace and
//! keeps a rolling window of recent response times. The core only
//! exposes counters and a read-only snapshot; the reporting surface
//! (the `/metrics` and `/api/metrics` routes) lives in the API adapter.

use std::collections::VecDeque;
use std::sync::Mutex;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use serde::Serialize;

/// Rolling response-time window size, matching the original sampler.
const RESPONSE_TIME_WINDOW: usize = 100;

/// Centralized metrics for the aggregation service.
pub struct ServiceMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Cache hits across both tiers.
    pub cache_hits: IntCounter,
    /// Cache misses (both tiers empty or unreachable).
    pub cache_misses: IntCounter,
    /// Pull-request latency histogram (milliseconds).
    pub response_time_ms: Histogram,
    /// Upstream fetch failures by source label.
    pub upstream_failures: IntCounterVec,
    /// Completed broadcast cycles.
    pub broadcast_cycles: IntCounter,
    /// Failed broadcast cycles (aggregation error).
    pub broadcast_failures: IntCounter,
    /// Currently connected WebSocket clients.
    pub connected_clients: IntGauge,
    /// Currently registered subscriptions.
    pub active_subscriptions: IntGauge,
    /// Connections force-closed by the heartbeat scanner.
    pub heartbeat_evictions: IntCounter,
    /// Rolling window of recent response times (ms).
    recent_response_times: Mutex<VecDeque<f64>>,
}

/// Read-only metrics snapshot for the external reporting surface.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Cache effectiveness.
    pub cache: CacheStats,
    /// Pull API latency.
    pub api: ApiStats,
    /// Snapshot wall-clock timestamp (RFC 3339).
    pub timestamp: String,
}

/// Cache hit/miss figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Hit count.
    pub hits: u64,
    /// Miss count.
    pub misses: u64,
    /// Hit rate in percent, rounded to two decimals.
    pub hit_rate: f64,
    /// Total lookups.
    pub total_requests: u64,
}

/// Pull API latency figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStats {
    /// Mean of the rolling window, rounded to whole milliseconds.
    pub average_response_time_ms: f64,
    /// Total observed requests.
    pub total_requests: u64,
    /// Last ten response times (ms).
    pub recent_response_times: Vec<f64>,
}

impl ServiceMetrics {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cache_hits =
            IntCounter::with_opts(Opts::new("dexfeed_cache_hits_total", "Cache hits"))?;
        let cache_misses =
            IntCounter::with_opts(Opts::new("dexfeed_cache_misses_total", "Cache misses"))?;

        let response_time_ms = Histogram::with_opts(
            HistogramOpts::new(
                "dexfeed_response_time_ms",
                "Pull request latency in milliseconds",
            )
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
        )?;

        let upstream_failures = IntCounterVec::new(
            Opts::new(
                "dexfeed_upstream_failures_total",
                "Upstream fetch failures by source",
            ),
            &["source"],
        )?;

        let broadcast_cycles = IntCounter::with_opts(Opts::new(
            "dexfeed_broadcast_cycles_total",
            "Completed broadcast cycles",
        ))?;
        let broadcast_failures = IntCounter::with_opts(Opts::new(
            "dexfeed_broadcast_failures_total",
            "Broadcast cycles that failed aggregation",
        ))?;

        let connected_clients = IntGauge::with_opts(Opts::new(
            "dexfeed_connected_clients",
            "Currently connected WebSocket clients",
        ))?;
        let active_subscriptions = IntGauge::with_opts(Opts::new(
            "dexfeed_active_subscriptions",
            "Currently registered subscriptions",
        ))?;
        let heartbeat_evictions = IntCounter::with_opts(Opts::new(
            "dexfeed_heartbeat_evictions_total",
            "Connections evicted for missed pongs",
        ))?;

        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(response_time_ms.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;
        registry.register(Box::new(broadcast_cycles.clone()))?;
        registry.register(Box::new(broadcast_failures.clone()))?;
        registry.register(Box::new(connected_clients.clone()))?;
        registry.register(Box::new(active_subscriptions.clone()))?;
        registry.register(Box::new(heartbeat_evictions.clone()))?;

        Ok(Self {
            registry,
            cache_hits,
            cache_misses,
            response_time_ms,
            upstream_failures,
            broadcast_cycles,
            broadcast_failures,
            connected_clients,
            active_subscriptions,
            heartbeat_evictions,
            recent_response_times: Mutex::new(VecDeque::with_capacity(RESPONSE_TIME_WINDOW)),
        })
    }

    /// Count a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    /// Count a cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// Observe one pull-request response time.
    pub fn record_response_time(&self, millis: f64) {
        self.response_time_ms.observe(millis);

        let mut window = self
            .recent_response_times
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if window.len() == RESPONSE_TIME_WINDOW {
            window.pop_front();
        }
        window.push_back(millis);
    }

    /// Count a per-source fetch failure.
    pub fn record_upstream_failure(&self, source: &str) {
        self.upstream_failures.with_label_values(&[source]).inc();
    }

    /// Assemble the read-only snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.cache_hits.get();
        let misses = self.cache_misses.get();
        let total = hits + misses;
        let hit_rate = if total > 0 {
            ((hits as f64 / total as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        let window = self
            .recent_response_times
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let average = if window.is_empty() {
            0.0
        } else {
            (window.iter().sum::<f64>() / window.len() as f64).round()
        };
        let recent: Vec<f64> = window.iter().rev().take(10).rev().copied().collect();

        MetricsSnapshot {
            cache: CacheStats {
                hits,
                misses,
                hit_rate,
                total_requests: total,
            },
            api: ApiStats {
                average_response_time_ms: average,
                total_requests: self.response_time_ms.get_sample_count(),
                recent_response_times: recent,
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Render the Prometheus text exposition.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_rounds_to_two_decimals() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache.hits, 2);
        assert_eq!(snapshot.cache.misses, 1);
        assert_eq!(snapshot.cache.total_requests, 3);
        assert!((snapshot.cache.hit_rate - 66.67).abs() < 0.001);
    }

    #[test]
    fn test_response_time_window_caps_at_hundred() {
        let metrics = ServiceMetrics::new().unwrap();
        for i in 0..150 {
            metrics.record_response_time(f64::from(i));
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.api.total_requests, 150);
        // Window holds 50..=149; the mean is 99.5, rounded to 100.
        assert!((snapshot.api.average_response_time_ms - 100.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.api.recent_response_times.len(), 10);
        assert!((snapshot.api.recent_response_times[9] - 149.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_render_contains_registered_families() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.record_cache_hit();
        let text = metrics.render();
        assert!(text.contains("dexfeed_cache_hits_total"));
    }
}
