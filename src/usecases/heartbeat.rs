//! Heartbeat Scanner - Periodic Liveness Sweep
//!
//! The second independent periodic task. Each pass visits every
//! tracked connection: past-timeout connections are force-closed and
//! their records torn down; everything else receives a probe. The
//! probe interval must stay strictly below the timeout (enforced at
//! config validation) so every connection gets at least one probe
//! opportunity before eviction.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::hub::ConnectionHub;
use crate::domain::protocol::ServerMessage;

/// Periodic driver for eviction and probing.
pub struct HeartbeatScanner {
    hub: Arc<ConnectionHub>,
    interval: Duration,
    timeout: Duration,
}

impl HeartbeatScanner {
    /// Build the scanner with its probe interval and pong timeout.
    pub fn new(hub: Arc<ConnectionHub>, interval: Duration, timeout: Duration) -> Self {
        Self {
            hub,
            interval,
            timeout,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            "Heartbeat scanner started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Heartbeat scanner shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One sweep, directly callable from tests.
    pub async fn tick(&self) {
        let outcome = self.hub.liveness().scan(self.timeout).await;

        for id in outcome.evicted {
            self.hub.evict(id).await;
        }

        for id in outcome.responsive {
            self.hub.send(id, ServerMessage::Ping).await;
        }

        let active = self.hub.connected().await;
        debug!(active, "Heartbeat check completed");
    }
}
