//! Broadcast Loop - Periodic Aggregation Fan-Out
//!
//! An independent cancellable periodic task. Each tick runs one
//! aggregation cycle with the canonical parameter set, stores the
//! result as the last-known-good snapshot, pushes the full result to
//! filter-matching subscribers, and pushes per-token deltas to explicit
//! allow-list subscribers. A failed cycle is counted and logged; the
//! next tick proceeds regardless.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::aggregator::AggregationService;
use super::hub::ConnectionHub;
use crate::adapters::metrics::ServiceMetrics;
use crate::domain::protocol::{ServerMessage, SubscriptionFilters};
use crate::domain::token::{AggregationParams, now_ms};

/// Periodic driver that fans aggregation results out to subscribers.
pub struct BroadcastLoop {
    aggregator: Arc<AggregationService>,
    hub: Arc<ConnectionHub>,
    metrics: Arc<ServiceMetrics>,
    interval: Duration,
    params: AggregationParams,
}

impl BroadcastLoop {
    /// Build the loop with its canonical parameter set.
    pub fn new(
        aggregator: Arc<AggregationService>,
        hub: Arc<ConnectionHub>,
        metrics: Arc<ServiceMetrics>,
        interval: Duration,
        params: AggregationParams,
    ) -> Self {
        Self {
            aggregator,
            hub,
            metrics,
            interval,
            params,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            params = %self.params.cache_key(),
            "Broadcast loop started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Broadcast loop shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One broadcast cycle, directly callable from tests.
    pub async fn tick(&self) {
        let result = match self.aggregator.aggregate(&self.params).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Broadcast cycle failed");
                self.metrics.broadcast_failures.inc();
                return;
            }
        };

        self.hub.set_snapshot(result.clone()).await;

        let update_shape = SubscriptionFilters {
            time: Some(self.params.time),
            sort: Some(self.params.sort.clone()),
            limit: Some(self.params.limit),
            tokens: None,
        };
        let timestamp = now_ms();

        let subscribers = self
            .hub
            .subscriptions()
            .subscribers_for_update(&update_shape)
            .await;
        let delivered = self
            .hub
            .send_to_all(
                &subscribers,
                &ServerMessage::TokenUpdates {
                    timestamp,
                    data: result.clone(),
                },
            )
            .await;

        for token in &result.tokens {
            let targets = self
                .hub
                .subscriptions()
                .delta_subscribers(&token.address)
                .await;
            if !targets.is_empty() {
                self.hub
                    .send_to_all(
                        &targets,
                        &ServerMessage::TokenUpdate {
                            timestamp,
                            token: token.clone(),
                        },
                    )
                    .await;
            }
        }

        self.metrics.broadcast_cycles.inc();
        debug!(
            subscribers = delivered,
            tokens = result.tokens.len(),
            "Broadcast cycle complete"
        );
    }
}
