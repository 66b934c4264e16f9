//! Redis Cache - Tier2 Shared Durable Cache
//!
//! Wraps a `ConnectionManager` so reconnection is handled by the redis
//! crate. Every failure path degrades to a miss (get) or a dropped
//! write (set) with a warning; tier2 unavailability must never fail the
//! caller.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{info, warn};

use crate::ports::cache_store::CacheStore;

/// Durable cache tier backed by Redis.
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL: {url}"))?;
        let manager = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!(url = %url, "Connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.manager.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Redis GET failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let mut conn = self.manager.clone();
        let ttl_seconds = ttl.as_secs().max(1);
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await {
            warn!(key = %key, error = %e, "Redis SETEX failed, dropping write");
        }
    }
}
