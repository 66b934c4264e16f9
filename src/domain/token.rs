//! Token Model - Normalized Asset Records and Query Parameters
//!
//! The `Token` struct is the single shape every upstream adapter
//! normalizes into before merging. Known numeric fields are typed;
//! everything else an upstream reports rides along in the open
//! extension map so windowed attributes (`volume_1h`, `price_change_24h`,
//! `market_cap`, ...) stay sortable without schema churn.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tradable asset record keyed by address.
///
/// Exactly one `Token` per address exists after merging. The extension
/// map holds passthrough attributes in upstream-reported form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Unique identity key across all upstream sources.
    pub address: String,
    /// Latest USD price.
    #[serde(default)]
    pub price: f64,
    /// Pooled liquidity in USD.
    #[serde(default)]
    pub liquidity: f64,
    /// Traded volume in USD.
    #[serde(default)]
    pub volume: f64,
    /// Timestamp of the latest price (Unix ms).
    #[serde(rename = "updatedAt", default)]
    pub updated_at: i64,
    /// Source labels that contributed to this record, in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    /// Passthrough attributes (windowed volumes, price changes, name, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// Create a token with the given identity and zeroed metrics.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            price: 0.0,
            liquidity: 0.0,
            volume: 0.0,
            updated_at: 0,
            sources: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Aggregation time window requested by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    /// Last hour.
    #[serde(rename = "1h")]
    OneHour,
    /// Last 24 hours (the default window).
    #[default]
    #[serde(rename = "24h")]
    OneDay,
    /// Last 7 days.
    #[serde(rename = "7d")]
    SevenDays,
}

impl TimeWindow {
    /// Field-name suffix used by window-resolved sort fields.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
        }
    }

    /// Parse a query-string window. Anything unrecognized falls back to
    /// 24h, matching the lenient handling of the REST surface.
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "1h" => Self::OneHour,
            "7d" => Self::SevenDays,
            _ => Self::OneDay,
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Parameters of one aggregation cycle.
///
/// Identical parameter shapes produce identical cache keys, so pull
/// requests and broadcast ticks with the same query collide on the
/// same cache slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationParams {
    /// Time window the sort fields resolve against.
    pub time: TimeWindow,
    /// Comma-separated sort spec, `-` prefix for descending.
    pub sort: String,
    /// Page size (clamped to [1, 100] by the HTTP adapter).
    pub limit: usize,
    /// Opaque cursor: the previous page's final address.
    pub cursor: Option<String>,
}

impl AggregationParams {
    /// The canonical parameter set driven by the broadcast loop.
    pub fn canonical() -> Self {
        Self {
            time: TimeWindow::OneDay,
            sort: "volume".to_string(),
            limit: 50,
            cursor: None,
        }
    }

    /// Deterministic cache key for this query shape.
    pub fn cache_key(&self) -> String {
        format!(
            "tokens:{}:{}:{}:{}",
            self.time,
            self.sort,
            self.limit,
            self.cursor.as_deref().unwrap_or("")
        )
    }
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            time: TimeWindow::OneDay,
            sort: "volume".to_string(),
            limit: 20,
            cursor: None,
        }
    }
}

/// One consolidated aggregation result, served to pull callers and
/// pushed to WebSocket subscribers in identical shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedTokens {
    /// Ranked page of merged tokens.
    pub tokens: Vec<Token>,
    /// Present only when the page is exactly full.
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Joined per-source failure notices, if any source was unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
