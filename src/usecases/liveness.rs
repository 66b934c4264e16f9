//! Connection Liveness Tracker - Heartbeat State Machine
//!
//! ALIVE → EVICTED, terminal. A record is created on connect, refreshed
//! on pong, and deleted on disconnect or eviction; deletion is what
//! makes eviction terminal, since a late pong finds no record to
//! refresh. Timestamps are `tokio::time::Instant` so the scanner is
//! testable under a paused-time runtime.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// Heartbeat state for one connection.
#[derive(Debug, Clone)]
pub struct LivenessRecord {
    /// When the last pong (or the connect) was observed.
    pub last_pong: Instant,
    /// Whether the connection has answered a probe since tracking began.
    pub alive: bool,
}

/// Result of one scanner pass.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Connections past the timeout; their records are already removed.
    pub evicted: Vec<Uuid>,
    /// Connections within the timeout; each should receive a probe.
    pub responsive: Vec<Uuid>,
}

/// Aggregated liveness figures for the stats snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessStats {
    /// Tracked connections.
    pub total_clients: usize,
    /// Connections within the timeout.
    pub responsive_clients: usize,
    /// Connections past the timeout (not yet swept).
    pub unresponsive_clients: usize,
    /// Mean time since last pong across responsive connections (ms).
    pub average_pong_age_ms: u64,
}

/// Tracks heartbeat state for every connection.
#[derive(Default)]
pub struct LivenessTracker {
    records: RwLock<HashMap<Uuid, LivenessRecord>>,
}

impl LivenessTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a connection; last pong starts at now.
    pub async fn track(&self, id: Uuid) {
        self.records.write().await.insert(
            id,
            LivenessRecord {
                last_pong: Instant::now(),
                alive: true,
            },
        );
    }

    /// Refresh a connection's last pong. Returns false when the
    /// connection is untracked (e.g. already evicted) — an evicted
    /// connection cannot be resurrected.
    pub async fn pong(&self, id: Uuid) -> bool {
        match self.records.write().await.get_mut(&id) {
            Some(record) => {
                record.last_pong = Instant::now();
                record.alive = true;
                true
            }
            None => false,
        }
    }

    /// Stop tracking a connection (disconnect path).
    pub async fn remove(&self, id: Uuid) {
        self.records.write().await.remove(&id);
    }

    /// Whether a connection is tracked.
    pub async fn contains(&self, id: Uuid) -> bool {
        self.records.read().await.contains_key(&id)
    }

    /// Number of tracked connections.
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// One scanner pass: partition every connection into evicted
    /// (elapsed > timeout, record removed here) or responsive (probe
    /// candidates).
    pub async fn scan(&self, timeout: Duration) -> ScanOutcome {
        let now = Instant::now();
        let mut records = self.records.write().await;
        let mut outcome = ScanOutcome::default();

        records.retain(|id, record| {
            if now.duration_since(record.last_pong) > timeout {
                outcome.evicted.push(*id);
                false
            } else {
                outcome.responsive.push(*id);
                true
            }
        });

        outcome
    }

    /// Current liveness figures without mutating any record.
    pub async fn stats(&self, timeout: Duration) -> LivenessStats {
        let now = Instant::now();
        let records = self.records.read().await;

        let mut responsive = 0usize;
        let mut age_sum = Duration::ZERO;
        let mut unresponsive = 0usize;

        for record in records.values() {
            let age = now.duration_since(record.last_pong);
            if age > timeout {
                unresponsive += 1;
            } else {
                responsive += 1;
                age_sum += age;
            }
        }

        let average_pong_age_ms = if responsive > 0 {
            (age_sum / responsive as u32).as_millis() as u64
        } else {
            0
        };

        LivenessStats {
            total_clients: records.len(),
            responsive_clients: responsive,
            unresponsive_clients: unresponsive,
            average_pong_age_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(35);

    #[tokio::test(start_paused = true)]
    async fn test_stale_connection_is_evicted_fresh_one_probed() {
        let tracker = LivenessTracker::new();
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();

        tracker.track(stale).await;
        tokio::time::advance(Duration::from_secs(36)).await;
        tracker.track(fresh).await;

        let outcome = tracker.scan(TIMEOUT).await;
        assert_eq!(outcome.evicted, vec![stale]);
        assert_eq!(outcome.responsive, vec![fresh]);

        // Eviction removed the record.
        assert!(!tracker.contains(stale).await);
        assert!(tracker.contains(fresh).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_defers_eviction() {
        let tracker = LivenessTracker::new();
        let id = Uuid::new_v4();
        tracker.track(id).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(tracker.pong(id).await);

        tokio::time::advance(Duration::from_secs(30)).await;
        let outcome = tracker.scan(TIMEOUT).await;
        assert!(outcome.evicted.is_empty());
        assert_eq!(outcome.responsive, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_cannot_resurrect_evicted_connection() {
        let tracker = LivenessTracker::new();
        let id = Uuid::new_v4();
        tracker.track(id).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        let outcome = tracker.scan(TIMEOUT).await;
        assert_eq!(outcome.evicted, vec![id]);

        assert!(!tracker.pong(id).await);
        assert_eq!(tracker.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_partition_and_average() {
        let tracker = LivenessTracker::new();
        let old = Uuid::new_v4();
        let young = Uuid::new_v4();

        tracker.track(old).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        tracker.track(young).await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let stats = tracker.stats(TIMEOUT).await;
        assert_eq!(stats.total_clients, 2);
        assert_eq!(stats.responsive_clients, 1);
        assert_eq!(stats.unresponsive_clients, 1);
        assert_eq!(stats.average_pong_age_ms, 10_000);
    }
}
