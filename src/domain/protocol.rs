//! Push Protocol - WebSocket Wire Messages and Subscription Filters
//!
//! Every frame on the persistent connection is a JSON envelope of the
//! form `{"event": ..., "payload": ...}`. Server events mirror the pull
//! API's result shape so a subscriber can treat `tokenUpdates` exactly
//! like a `GET /api/tokens` response.

use serde::{Deserialize, Serialize};

use super::token::{AggregatedTokens, TimeWindow, Token};

/// Per-connection filter state.
///
/// All fields optional: an unset field never excludes an update, an
/// unset token list matches every address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionFilters {
    /// Time window the subscriber cares about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeWindow>,
    /// Sort spec the subscriber cares about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Maximum page size the subscriber accepts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Explicit token allow-list; `None` receives all tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
}

impl SubscriptionFilters {
    /// The default subscription installed for every new connection.
    pub fn connection_default() -> Self {
        Self {
            time: Some(TimeWindow::OneDay),
            sort: Some("volume".to_string()),
            limit: Some(50),
            tokens: None,
        }
    }

    /// Field-wise merge: provided fields overwrite, absent fields keep
    /// their current value.
    pub fn merge_from(&mut self, update: Self) {
        if update.time.is_some() {
            self.time = update.time;
        }
        if update.sort.is_some() {
            self.sort = update.sort;
        }
        if update.limit.is_some() {
            self.limit = update.limit;
        }
        if update.tokens.is_some() {
            self.tokens = update.tokens;
        }
    }

    /// Whether this subscription wants updates for the given address.
    pub fn matches_token(&self, address: &str) -> bool {
        self.tokens
            .as_ref()
            .map_or(true, |list| list.iter().any(|a| a == address))
    }

    /// Whole-result broadcast filter: time and sort must be unset or
    /// equal, and the update's limit must not exceed the subscriber's.
    ///
    /// The reverse limit case (subscriber limit above the update's) is
    /// deliberately allowed; such a subscriber receives fewer items than
    /// it configured.
    pub fn matches_update(&self, update: &Self) -> bool {
        if let (Some(mine), Some(theirs)) = (self.time, update.time) {
            if mine != theirs {
                return false;
            }
        }
        if let (Some(mine), Some(theirs)) = (self.sort.as_deref(), update.sort.as_deref()) {
            if mine != theirs {
                return false;
            }
        }
        if let (Some(mine), Some(theirs)) = (self.limit, update.limit) {
            if theirs > mine {
                return false;
            }
        }
        true
    }
}

/// Server-to-client events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full snapshot pushed right after connect.
    InitialTokens(AggregatedTokens),
    /// Periodic full aggregation result for filter-matching subscribers.
    TokenUpdates {
        /// Broadcast timestamp (Unix ms).
        timestamp: i64,
        /// The full aggregation result.
        data: AggregatedTokens,
    },
    /// Per-token delta for explicit allow-list subscribers.
    TokenUpdate {
        /// Broadcast timestamp (Unix ms).
        timestamp: i64,
        /// The updated token.
        token: Token,
    },
    /// Acknowledges a wholesale `subscribe`.
    SubscriptionConfirmed {
        /// The installed filters.
        filters: SubscriptionFilters,
    },
    /// Acknowledges a `subscribeToTokens`.
    TokenSubscriptionConfirmed {
        /// The installed allow-list.
        tokens: Vec<String>,
    },
    /// Acknowledges an `updateFilters`.
    FiltersUpdated {
        /// The merged filters now in effect.
        filters: SubscriptionFilters,
    },
    /// Liveness probe; the client must answer with `pong`.
    Ping,
    /// Non-fatal error notification; the connection stays open.
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// Client-to-server events.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Replace the subscription wholesale.
    Subscribe(SubscriptionFilters),
    /// Merge a token allow-list into the existing filters.
    SubscribeToTokens(Vec<String>),
    /// Merge individual filter fields into the existing filters.
    UpdateFilters(SubscriptionFilters),
    /// Liveness probe reply.
    Pong,
}
