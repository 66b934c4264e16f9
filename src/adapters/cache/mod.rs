//! Cache Adapters - Two-Tier Token Result Cache
//!
//! Tier1 is a fast in-process map with a short TTL; tier2 is a shared
//! Redis instance with a longer TTL. `TieredCache` composes the two
//! behind the common `CacheStore` contract with memory-then-durable
//! fallthrough and tier1 backfill on a tier2 hit.

pub mod memory;
pub mod redis;
pub mod tiered;

pub use memory::MemoryCache;
pub use redis::RedisCache;
pub use tiered::TieredCache;
