//! Configuration Loader
//!
//! Reads `config.toml`, deserializes it, and validates cross-field
//! constraints before the service starts.

use std::path::Path;

use anyhow::{Context, Result, ensure};

use super::AppConfig;

/// Load and validate configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate cross-field constraints that serde defaults cannot express.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    ensure!(
        !config.service.name.is_empty(),
        "service.name must not be empty"
    );
    ensure!(
        !config.service.bind_address.is_empty(),
        "service.bind_address must not be empty"
    );

    ensure!(
        config.cache.tier1_ttl_seconds > 0,
        "cache.tier1_ttl_seconds must be positive"
    );
    ensure!(
        config.cache.tier2_ttl_seconds >= config.cache.tier1_ttl_seconds,
        "cache.tier2_ttl_seconds must be at least tier1_ttl_seconds"
    );

    ensure!(
        !config.upstreams.dexscreener_url.is_empty(),
        "upstreams.dexscreener_url must not be empty"
    );
    ensure!(
        !config.upstreams.geckoterminal_url.is_empty(),
        "upstreams.geckoterminal_url must not be empty"
    );
    ensure!(
        config.upstreams.timeout_seconds > 0,
        "upstreams.timeout_seconds must be positive"
    );

    ensure!(
        config.broadcast.interval_seconds > 0,
        "broadcast.interval_seconds must be positive"
    );
    ensure!(
        config.broadcast.limit > 0,
        "broadcast.limit must be positive"
    );

    ensure!(
        config.heartbeat.interval_seconds > 0,
        "heartbeat.interval_seconds must be positive"
    );
    // The probe must fire at least once inside every timeout window,
    // otherwise a healthy client can be evicted between probes.
    ensure!(
        config.heartbeat.interval_seconds < config.heartbeat.timeout_seconds,
        "heartbeat.interval_seconds must be strictly below heartbeat.timeout_seconds"
    );

    Ok(())
}
