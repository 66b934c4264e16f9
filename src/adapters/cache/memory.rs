//! In-Process Memory Cache - Tier1
//!
//! A plain map of key to (value, deadline). Expiry is checked lazily on
//! read and the stale entry removed; no background sweep runs. Deadlines
//! use `tokio::time::Instant` so TTL behavior is testable under a
//! paused-time runtime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::ports::cache_store::CacheStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Ephemeral in-process cache tier.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including not-yet-evicted expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if Instant::now() <= entry.expires_at => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: evict lazily under the write lock.
        self.entries.write().await.remove(key);
        None
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(1)).await;

        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(1_100)).await;
        assert_eq!(cache.get("k").await, None);
        // The expired entry was evicted on read, not merely hidden.
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_refreshes_deadline() {
        let cache = MemoryCache::new();
        cache.set("k", "old", Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        cache.set("k", "new", Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_missing_key_is_a_miss() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("absent").await, None);
    }
}
