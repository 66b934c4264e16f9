//! Ranking Engine - Multi-Key Sort and Cursor Pagination
//!
//! Parses comma-separated sort specs (`volume,-priceChange`), resolves
//! logical fields to window-specific concrete fields, applies a stable
//! multi-key sort, and pages the result with an opaque address cursor.

use std::cmp::Ordering;

use serde_json::Value;

use super::token::{AggregationParams, TimeWindow, Token};

/// One resolved sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Concrete field name to compare on.
    pub field: String,
    /// True for `-` prefixed (descending) keys.
    pub descending: bool,
}

/// Parse a sort spec into resolved keys.
///
/// Logical fields `volume`, `priceChange` and `marketCap` resolve against
/// the requested window; unrecognized tokens pass through as literal
/// field names.
pub fn parse_sort_spec(spec: &str, window: TimeWindow) -> Vec<SortKey> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, descending) = match part.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (part, false),
            };
            let field = match name {
                "volume" => format!("volume_{}", window.suffix()),
                "priceChange" => format!("price_change_{}", window.suffix()),
                "marketCap" => "market_cap".to_string(),
                other => other.to_string(),
            };
            SortKey { field, descending }
        })
        .collect()
}

/// Numeric value of a field for comparison; missing values default to 0.
///
/// The typed struct fields resolve directly, everything else reads the
/// extension map (accepting numbers or numeric strings, as upstreams
/// report both).
fn sort_value(token: &Token, field: &str) -> f64 {
    match field {
        "price" => token.price,
        "liquidity" => token.liquidity,
        "volume" => token.volume,
        "updatedAt" => token.updated_at as f64,
        _ => token
            .extra
            .get(field)
            .and_then(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .unwrap_or(0.0),
    }
}

/// Stable multi-key sort: keys are compared in listed order, the first
/// non-equal key decides, and total ties preserve relative input order.
pub fn sort_tokens(tokens: &mut [Token], keys: &[SortKey]) {
    tokens.sort_by(|a, b| {
        for key in keys {
            let av = sort_value(a, &key.field);
            let bv = sort_value(b, &key.field);
            let ord = if key.descending {
                bv.total_cmp(&av)
            } else {
                av.total_cmp(&bv)
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Cursor-based page extraction over an already-sorted list.
///
/// The cursor is the address of the previous page's last item; the next
/// page starts immediately after it (cursor not found starts at 0). The
/// returned cursor is present only when the page is exactly full.
pub fn paginate(
    sorted: Vec<Token>,
    limit: usize,
    cursor: Option<&str>,
) -> (Vec<Token>, Option<String>) {
    let start = cursor
        .and_then(|c| sorted.iter().position(|t| t.address == c).map(|i| i + 1))
        .unwrap_or(0);

    let page: Vec<Token> = sorted.into_iter().skip(start).take(limit).collect();
    let next_cursor = if !page.is_empty() && page.len() == limit {
        page.last().map(|t| t.address.clone())
    } else {
        None
    };

    (page, next_cursor)
}

/// Full ranking pass for one aggregation cycle: sort then paginate
/// according to the caller-supplied params.
pub fn rank(mut tokens: Vec<Token>, params: &AggregationParams) -> (Vec<Token>, Option<String>) {
    let keys = parse_sort_spec(&params.sort, params.time);
    sort_tokens(&mut tokens, &keys);
    paginate(tokens, params.limit, params.cursor.as_deref())
}
