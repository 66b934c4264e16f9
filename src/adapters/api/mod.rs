//! API Adapter - HTTP Routes and WebSocket Upgrade
//!
//! The inbound surface of the service: a health probe, the paginated
//! token query endpoint, operational metrics in JSON and Prometheus
//! text form, and the WebSocket upgrade path.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, instrument};

use crate::adapters::metrics::ServiceMetrics;
use crate::adapters::ws;
use crate::domain::token::{AggregationParams, TimeWindow, now_ms};
use crate::usecases::{AggregationService, ConnectionHub};

/// Shared state handed to every handler.
pub struct AppState {
    /// Fetch, merge, rank, and cache pipeline.
    pub aggregator: Arc<AggregationService>,
    /// Connected-client registry and fan-out.
    pub hub: Arc<ConnectionHub>,
    /// Operational counters.
    pub metrics: Arc<ServiceMetrics>,
    /// Heartbeat timeout, reported in the stats endpoint.
    pub heartbeat_timeout: Duration,
    /// Service name, reported by the health probe.
    pub service_name: String,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/tokens", get(get_tokens))
        .route("/api/metrics", get(get_metrics))
        .route("/metrics", get(get_prometheus))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Raw query parameters for `/api/tokens`. Everything arrives as a
/// string and is normalized into [`AggregationParams`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TokensQuery {
    time: Option<String>,
    sort: Option<String>,
    limit: Option<String>,
    next_cursor: Option<String>,
}

impl TokensQuery {
    fn into_params(self) -> AggregationParams {
        let limit = self
            .limit
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(20)
            .clamp(1, 100);
        AggregationParams {
            time: self
                .time
                .map(|raw| TimeWindow::from_param(&raw))
                .unwrap_or_default(),
            sort: self.sort.unwrap_or_else(|| "volume".to_string()),
            limit,
            cursor: self.next_cursor.filter(|cursor| !cursor.is_empty()),
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    axum::Json(json!({
        "status": "ok",
        "service": state.service_name,
        "timestamp": now_ms(),
    }))
    .into_response()
}

#[instrument(skip(state, query))]
async fn get_tokens(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokensQuery>,
) -> Response {
    let params = query.into_params();
    let started = std::time::Instant::now();
    let result = state.aggregator.aggregate(&params).await;
    state
        .metrics
        .record_response_time(started.elapsed().as_secs_f64() * 1_000.0);

    match result {
        Ok(page) => axum::Json(page).into_response(),
        Err(err) => {
            error!(error = %err, "token aggregation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": "Failed to fetch token data",
                    "details": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.metrics.snapshot();
    let hub = state.hub.stats(state.heartbeat_timeout).await;
    axum::Json(json!({
        "cache": snapshot.cache,
        "api": snapshot.api,
        "connections": hub,
        "timestamp": snapshot.timestamp,
    }))
    .into_response()
}

async fn get_prometheus(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

async fn ws_upgrade(State(state): State<Arc<AppState>>, upgrade: WebSocketUpgrade) -> Response {
    let id = ws::new_connection_id();
    upgrade.on_upgrade(move |socket| ws::run_session(state, socket, id))
}
