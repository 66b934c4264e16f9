//! WebSocket Adapter - Client Session Lifecycle
//!
//! Owns a single client connection from upgrade to close: registration
//! with the connection hub, the initial snapshot push, the inbound
//! message dispatch loop, and teardown.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::api::AppState;
use crate::domain::protocol::{ClientMessage, ServerMessage, SubscriptionFilters};
use crate::domain::token::AggregationParams;
use crate::usecases::ConnectionId;

/// Drive a client session to completion. Spawned once per upgrade.
#[instrument(skip(state, socket), fields(connection = %id))]
pub async fn run_session(state: Arc<AppState>, socket: WebSocket, id: ConnectionId) {
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.hub.register(id, tx).await;
    info!("client connected");

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, rx));

    send_initial_snapshot(&state, id).await;
    read_loop(&state, stream, id).await;

    state.hub.unregister(id).await;
    writer.abort();
    info!("client disconnected");
}

/// Push the latest aggregate to a freshly connected client.
///
/// Prefers the broadcast loop's cached snapshot; falls back to a fresh
/// canonical aggregation when no broadcast has completed yet. A failed
/// fetch sends an error frame but keeps the connection open.
async fn send_initial_snapshot(state: &AppState, id: ConnectionId) {
    let snapshot = match state.hub.snapshot().await {
        Some(snapshot) => Some(snapshot),
        None => {
            let params = AggregationParams::canonical();
            match state.aggregator.aggregate(&params).await {
                Ok(result) => Some(result),
                Err(error) => {
                    warn!(%error, "initial snapshot aggregation failed");
                    None
                }
            }
        }
    };

    let message = match snapshot {
        Some(result) => ServerMessage::InitialTokens(result),
        None => ServerMessage::Error {
            message: "Failed to fetch initial data".to_string(),
        },
    };
    state.hub.send(id, message).await;
}

/// Forward hub messages to the socket until the channel closes.
///
/// The hub closes the channel by dropping the sender on unregister or
/// eviction, which ends this task and the underlying connection.
async fn write_loop(
    mut sink: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = rx.recv().await {
        let frame = match serde_json::to_string(&message) {
            Ok(json) => Message::Text(json),
            Err(error) => {
                warn!(%error, "failed to serialize outbound frame");
                continue;
            }
        };
        if sink.send(frame).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Dispatch inbound frames until the client disconnects.
async fn read_loop(
    state: &AppState,
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    id: ConnectionId,
) {
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                debug!(%error, "socket read failed");
                break;
            }
        };
        match frame {
            Message::Text(text) => handle_client_message(state, id, &text).await,
            Message::Close(_) => break,
            // axum answers protocol-level pings itself.
            _ => {}
        }
    }
}

/// Parse and apply one client frame, acknowledging state changes.
async fn handle_client_message(state: &AppState, id: ConnectionId, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(error) => {
            debug!(%error, "ignoring malformed client frame");
            state
                .hub
                .send(
                    id,
                    ServerMessage::Error {
                        message: "Unrecognized message".to_string(),
                    },
                )
                .await;
            return;
        }
    };

    match message {
        ClientMessage::Subscribe(filters) => {
            let filters = normalized(filters);
            state.hub.subscriptions().subscribe(id, filters.clone()).await;
            state
                .hub
                .send(id, ServerMessage::SubscriptionConfirmed { filters })
                .await;
        }
        ClientMessage::SubscribeToTokens(tokens) => {
            let filters = state.hub.subscriptions().subscribe_tokens(id, tokens).await;
            state
                .hub
                .send(
                    id,
                    ServerMessage::TokenSubscriptionConfirmed {
                        tokens: filters.tokens.unwrap_or_default(),
                    },
                )
                .await;
        }
        ClientMessage::UpdateFilters(update) => {
            let filters = state.hub.subscriptions().update_filters(id, update).await;
            state
                .hub
                .send(id, ServerMessage::FiltersUpdated { filters })
                .await;
        }
        ClientMessage::Pong => state.hub.pong(id).await,
    }
}

/// Fill unset fields of an explicit subscription with the defaults, so
/// a bare `subscribe` behaves like the connection-time subscription.
fn normalized(filters: SubscriptionFilters) -> SubscriptionFilters {
    let mut base = SubscriptionFilters::connection_default();
    base.merge_from(filters);
    base
}

/// Allocate an identity for a new connection.
pub fn new_connection_id() -> ConnectionId {
    Uuid::new_v4()
}
