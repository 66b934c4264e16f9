//! Tiered Cache - Memory-Then-Durable Fallthrough
//!
//! Checks tier1 first, falls through to tier2 and backfills tier1 on a
//! hit, otherwise reports a miss. Writes go to both tiers with their
//! respective TTLs; the two writes are not transactional and a partial
//! write is accepted. Tier2 is optional so the service runs tier1-only
//! when Redis is not configured or unreachable at startup.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::memory::MemoryCache;
use crate::adapters::metrics::ServiceMetrics;
use crate::ports::cache_store::CacheStore;

/// Two-tier cache used by the aggregation coordinator.
pub struct TieredCache {
    tier1: MemoryCache,
    tier2: Option<Arc<dyn CacheStore>>,
    tier1_ttl: Duration,
    tier2_ttl: Duration,
    metrics: Arc<ServiceMetrics>,
}

impl TieredCache {
    /// Compose the two tiers with their TTLs.
    pub fn new(
        tier2: Option<Arc<dyn CacheStore>>,
        tier1_ttl: Duration,
        tier2_ttl: Duration,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            tier1: MemoryCache::new(),
            tier2,
            tier1_ttl,
            tier2_ttl,
            metrics,
        }
    }

    /// Look up a key across both tiers, recording hit/miss.
    ///
    /// A tier2 hit backfills tier1 under the short TTL so subsequent
    /// reads stay in-process.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.tier1.get(key).await {
            debug!(key = %key, tier = 1, "Cache hit");
            self.metrics.record_cache_hit();
            return Some(value);
        }

        if let Some(tier2) = &self.tier2 {
            if let Some(value) = tier2.get(key).await {
                debug!(key = %key, tier = 2, "Cache hit, backfilling tier1");
                self.tier1.set(key, &value, self.tier1_ttl).await;
                self.metrics.record_cache_hit();
                return Some(value);
            }
        }

        debug!(key = %key, "Cache miss");
        self.metrics.record_cache_miss();
        None
    }

    /// Write a value to both tiers.
    pub async fn set(&self, key: &str, value: &str) {
        self.tier1.set(key, value, self.tier1_ttl).await;
        if let Some(tier2) = &self.tier2 {
            tier2.set(key, value, self.tier2_ttl).await;
        }
    }

    /// Whether a durable tier is attached.
    pub fn has_durable_tier(&self) -> bool {
        self.tier2.is_some()
    }
}
