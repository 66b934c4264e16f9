//! Connection Hub - Shared State for the Push Surface
//!
//! Owns the outbound sender per connection, the subscription registry,
//! the liveness tracker, and the last-known-good broadcast snapshot.
//! Connect/disconnect/broadcast/heartbeat all run concurrently, so
//! every map lives behind its own lock and the hub is the only owner;
//! collaborators receive it as an `Arc`, never through globals.
//!
//! Force-closing a connection works by dropping its outbound sender:
//! the session's write task sees the channel close and shuts the
//! socket down.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use super::liveness::{LivenessStats, LivenessTracker};
use super::subscriptions::SubscriptionRegistry;
use crate::adapters::metrics::ServiceMetrics;
use crate::domain::protocol::{ServerMessage, SubscriptionFilters};
use crate::domain::token::AggregatedTokens;

/// Identity shared by a connection's subscription, liveness record,
/// and outbound channel.
pub type ConnectionId = Uuid;

/// Connection/subscription figures for the stats snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    /// Connections with a live outbound channel.
    pub connected_clients: usize,
    /// Registered subscriptions.
    pub total_subscriptions: usize,
    /// Heartbeat figures.
    pub heartbeat: LivenessStats,
}

/// Shared hub for all WebSocket connections.
pub struct ConnectionHub {
    peers: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
    subscriptions: SubscriptionRegistry,
    liveness: LivenessTracker,
    snapshot: RwLock<Option<AggregatedTokens>>,
    metrics: Arc<ServiceMetrics>,
}

impl ConnectionHub {
    /// Create an empty hub.
    pub fn new(metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            subscriptions: SubscriptionRegistry::new(),
            liveness: LivenessTracker::new(),
            snapshot: RwLock::new(None),
            metrics,
        }
    }

    /// Register a new connection: outbound channel, liveness record,
    /// and the default subscription, torn down together on disconnect.
    pub async fn register(&self, id: ConnectionId, sender: mpsc::UnboundedSender<ServerMessage>) {
        self.peers.write().await.insert(id, sender);
        self.liveness.track(id).await;
        self.subscriptions
            .subscribe(id, SubscriptionFilters::connection_default())
            .await;

        self.sync_gauges().await;
        let active = self.connected().await;
        info!(connection = %id, active, "Client connected");
    }

    /// Tear down a connection (client-initiated disconnect path).
    pub async fn unregister(&self, id: ConnectionId) {
        self.peers.write().await.remove(&id);
        self.liveness.remove(id).await;
        self.subscriptions.unsubscribe(id).await;

        self.sync_gauges().await;
        let active = self.connected().await;
        info!(connection = %id, active, "Client disconnected");
    }

    /// Force-close an unresponsive connection (heartbeat eviction
    /// path). The liveness record was already removed by the scan.
    pub async fn evict(&self, id: ConnectionId) {
        self.peers.write().await.remove(&id);
        self.subscriptions.unsubscribe(id).await;
        self.metrics.heartbeat_evictions.inc();

        self.sync_gauges().await;
        info!(connection = %id, "Client evicted for missed pongs");
    }

    /// Send one message to one connection. Returns false when the
    /// connection is gone.
    pub async fn send(&self, id: ConnectionId, message: ServerMessage) -> bool {
        match self.peers.read().await.get(&id) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Send one message to a set of connections; returns the number of
    /// successful deliveries.
    pub async fn send_to_all(&self, ids: &[ConnectionId], message: &ServerMessage) -> usize {
        let peers = self.peers.read().await;
        let mut delivered = 0;
        for id in ids {
            if let Some(sender) = peers.get(id) {
                if sender.send(message.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Record a pong from a connection.
    pub async fn pong(&self, id: ConnectionId) {
        if self.liveness.pong(id).await {
            debug!(connection = %id, "Pong received");
        } else {
            debug!(connection = %id, "Pong from untracked connection ignored");
        }
    }

    /// The subscription registry.
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// The liveness tracker.
    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// Number of connected clients.
    pub async fn connected(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Last-known-good broadcast result, if any cycle has completed.
    pub async fn snapshot(&self) -> Option<AggregatedTokens> {
        self.snapshot.read().await.clone()
    }

    /// Store the latest broadcast result for new connections.
    pub async fn set_snapshot(&self, result: AggregatedTokens) {
        *self.snapshot.write().await = Some(result);
    }

    /// Connection/subscription/heartbeat figures for `/api/metrics`.
    pub async fn stats(&self, heartbeat_timeout: Duration) -> HubStats {
        HubStats {
            connected_clients: self.connected().await,
            total_subscriptions: self.subscriptions.count().await,
            heartbeat: self.liveness.stats(heartbeat_timeout).await,
        }
    }

    async fn sync_gauges(&self) {
        self.metrics
            .connected_clients
            .set(self.connected().await as i64);
        self.metrics
            .active_subscriptions
            .set(self.subscriptions.count().await as i64);
    }
}
