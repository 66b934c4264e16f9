//! Dexfeed — Entry Point
//!
//! Initializes configuration, logging, the cache tiers, the upstream
//! sources, and the fan-out machinery. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Connect Redis tier2 (optional — degrades to tier1-only)
//! 4. Create BackoffClient (HTTP + timeout + 429 retry)
//! 5. Create DexScreener + GeckoTerminal sources
//! 6. Create TieredCache → AggregationService pipeline
//! 7. Create ConnectionHub (peers + subscriptions + liveness)
//! 8. Spawn HTTP/WebSocket server
//! 9. Spawn BroadcastLoop + HeartbeatScanner
//! 10. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::api::AppState;
use adapters::cache::{RedisCache, TieredCache};
use adapters::metrics::ServiceMetrics;
use adapters::upstream::{BackoffClient, DexScreenerSource, GeckoTerminalSource, RetryPolicy};
use ports::CacheStore;
use ports::TokenSource;
use usecases::{AggregationService, BroadcastLoop, ConnectionHub, HeartbeatScanner};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.service.log_level)
            }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.service.bind_address,
        "Starting token feed service"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Metrics registry ─────────────────────────────────
    let metrics = Arc::new(ServiceMetrics::new().context("Failed to build metrics registry")?);

    // ── 5. Optional Redis tier2 ─────────────────────────────
    let tier2: Option<Arc<dyn CacheStore>> = match &config.cache.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!(error = %e, "Redis unavailable — running tier1-only");
                None
            }
        },
        None => {
            info!("No Redis URL configured — running tier1-only");
            None
        }
    };

    let cache = Arc::new(TieredCache::new(
        tier2,
        Duration::from_secs(config.cache.tier1_ttl_seconds),
        Duration::from_secs(config.cache.tier2_ttl_seconds),
        Arc::clone(&metrics),
    ));

    // ── 6. HTTP client with bounded 429 backoff ─────────────
    let retry = RetryPolicy {
        max_retries: config.upstreams.retry.max_retries,
        base_delay: Duration::from_millis(config.upstreams.retry.base_delay_ms),
        max_jitter: Duration::from_millis(config.upstreams.retry.max_jitter_ms),
    };
    let client = Arc::new(
        BackoffClient::new(Duration::from_secs(config.upstreams.timeout_seconds), retry)
            .context("Failed to build HTTP client")?,
    );

    // ── 7. Upstream sources ─────────────────────────────────
    let sources: Vec<Arc<dyn TokenSource>> = vec![
        Arc::new(DexScreenerSource::new(
            Arc::clone(&client),
            config.upstreams.dexscreener_url.clone(),
            config.upstreams.search_query.clone(),
        )),
        Arc::new(GeckoTerminalSource::new(
            Arc::clone(&client),
            config.upstreams.geckoterminal_url.clone(),
            config.upstreams.network.clone(),
        )),
    ];

    // ── 8. Aggregation pipeline + connection hub ────────────
    let aggregator = Arc::new(AggregationService::new(
        sources,
        Arc::clone(&cache),
        Arc::clone(&metrics),
    ));
    let hub = Arc::new(ConnectionHub::new(Arc::clone(&metrics)));

    // ── 9. Spawn HTTP/WebSocket server ──────────────────────
    let state = Arc::new(AppState {
        aggregator: Arc::clone(&aggregator),
        hub: Arc::clone(&hub),
        metrics: Arc::clone(&metrics),
        heartbeat_timeout: config.heartbeat.timeout(),
        service_name: config.service.name.clone(),
    });
    let router = adapters::api::router(state);
    let bind_address = config.service.bind_address.clone();
    let mut server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(&bind_address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, bind = %bind_address, "Failed to bind listener");
                return;
            }
        };
        info!(bind = %bind_address, "HTTP/WebSocket server listening");
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = server_shutdown.recv().await;
        });
        if let Err(e) = serve.await {
            error!(error = %e, "Server task failed");
        }
    });

    // ── 10. Spawn broadcast loop ────────────────────────────
    let broadcaster = BroadcastLoop::new(
        Arc::clone(&aggregator),
        Arc::clone(&hub),
        Arc::clone(&metrics),
        Duration::from_secs(config.broadcast.interval_seconds),
        config.broadcast.params(),
    );
    let broadcast_shutdown = shutdown_tx.subscribe();
    let broadcast_handle = tokio::spawn(async move {
        broadcaster.run(broadcast_shutdown).await;
    });

    // ── 11. Spawn heartbeat scanner ─────────────────────────
    let scanner = HeartbeatScanner::new(
        Arc::clone(&hub),
        config.heartbeat.interval(),
        config.heartbeat.timeout(),
    );
    let heartbeat_shutdown = shutdown_tx.subscribe();
    let heartbeat_handle = tokio::spawn(async move {
        scanner.run(heartbeat_shutdown).await;
    });

    info!("All tasks spawned — service is running");

    // ── 12. Wait for SIGINT ─────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    let _ = tokio::time::timeout(Duration::from_secs(10), broadcast_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(10), heartbeat_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(10), server_handle).await;

    info!("Shutdown complete");
    Ok(())
}
