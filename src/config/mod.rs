//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. All endpoint
//! URLs, TTLs, and timer intervals are externalized here - nothing is
//! hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::token::{AggregationParams, TimeWindow};

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Service identity and HTTP binding.
    pub service: ServiceConfig,
    /// Two-tier cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upstream source endpoints and retry policy.
    #[serde(default)]
    pub upstreams: UpstreamConfig,
    /// Broadcast loop settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// Heartbeat scanner settings.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Human-readable service name.
    pub name: String,
    /// Listen address for the HTTP/WebSocket surface.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Two-tier cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Redis URL for tier2; unset runs tier1-only.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Tier1 (in-process) TTL in seconds.
    #[serde(default = "default_tier1_ttl")]
    pub tier1_ttl_seconds: u64,
    /// Tier2 (Redis) TTL in seconds.
    #[serde(default = "default_tier2_ttl")]
    pub tier2_ttl_seconds: u64,
}

/// Upstream source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// DexScreener API base URL.
    #[serde(default = "default_dexscreener_url")]
    pub dexscreener_url: String,
    /// DexScreener search query.
    #[serde(default = "default_search_query")]
    pub search_query: String,
    /// GeckoTerminal API base URL.
    #[serde(default = "default_geckoterminal_url")]
    pub geckoterminal_url: String,
    /// GeckoTerminal network slug.
    #[serde(default = "default_network")]
    pub network: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// 429 retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Bounded 429 backoff configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper jitter bound in milliseconds.
    #[serde(default = "default_max_jitter")]
    pub max_jitter_ms: u64,
}

/// Broadcast loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Tick interval in seconds.
    #[serde(default = "default_broadcast_interval")]
    pub interval_seconds: u64,
    /// Canonical time window.
    #[serde(default)]
    pub time: TimeWindow,
    /// Canonical sort spec.
    #[serde(default = "default_broadcast_sort")]
    pub sort: String,
    /// Canonical page size.
    #[serde(default = "default_broadcast_limit")]
    pub limit: usize,
}

/// Heartbeat scanner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Probe interval in seconds; must be strictly below the timeout.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_seconds: u64,
    /// Pong timeout in seconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout_seconds: u64,
}

impl BroadcastConfig {
    /// The canonical parameter set the broadcast loop aggregates with.
    pub fn params(&self) -> AggregationParams {
        AggregationParams {
            time: self.time,
            sort: self.sort.clone(),
            limit: self.limit,
            cursor: None,
        }
    }
}

impl HeartbeatConfig {
    /// Probe interval as a `Duration`.
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Pong timeout as a `Duration`.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            tier1_ttl_seconds: default_tier1_ttl(),
            tier2_ttl_seconds: default_tier2_ttl(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            dexscreener_url: default_dexscreener_url(),
            search_query: default_search_query(),
            geckoterminal_url: default_geckoterminal_url(),
            network: default_network(),
            timeout_seconds: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
            max_jitter_ms: default_max_jitter(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_broadcast_interval(),
            time: TimeWindow::OneDay,
            sort: default_broadcast_sort(),
            limit: default_broadcast_limit(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_heartbeat_interval(),
            timeout_seconds: default_heartbeat_timeout(),
        }
    }
}

// Default value functions for serde

fn default_bind_address() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tier1_ttl() -> u64 {
    5
}

fn default_tier2_ttl() -> u64 {
    30
}

fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_search_query() -> String {
    "solana".to_string()
}

fn default_geckoterminal_url() -> String {
    "https://api.geckoterminal.com".to_string()
}

fn default_network() -> String {
    "solana".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_jitter() -> u64 {
    1_000
}

fn default_broadcast_interval() -> u64 {
    5
}

fn default_broadcast_sort() -> String {
    "volume".to_string()
}

fn default_broadcast_limit() -> usize {
    50
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_heartbeat_timeout() -> u64 {
    35
}
