//! Cache Store Port - Best-Effort Key/Value Contract
//!
//! Both cache tiers (in-process memory, Redis) satisfy this identical
//! get/set contract, so the layered fallthrough composition stays
//! swappable and testable in isolation.

use std::time::Duration;

use async_trait::async_trait;

/// A best-effort key/value store with per-entry TTL.
///
/// The cache is never a source of truth: backend failures surface as
/// misses (`None`) or silently dropped writes, never as errors to the
/// caller. Values are serialized JSON strings so both tiers share one
/// representation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value; expired or unreachable entries are `None`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Write a value with the given time-to-live.
    async fn set(&self, key: &str, value: &str, ttl: Duration);
}
