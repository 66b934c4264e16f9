//! GeckoTerminal Source - Network Tokens Feed
//!
//! GeckoTerminal wraps everything in a JSON:API envelope with string
//! encoded numerics, so this adapter owns a real field mapping:
//! `id` → address, `attributes.price_usd`/`liquidity_usd`/`volume_usd`
//! parsed from number-or-string, `last_priced_at` (RFC 3339) → unix ms.
//! All attributes ride along in the extension map.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::debug;

use super::BackoffClient;
use crate::domain::token::{now_ms, Token};
use crate::ports::token_source::TokenSource;

/// Source label used in warnings and merged source lists.
pub const SOURCE_NAME: &str = "GeckoTerminal";

/// GeckoTerminal network-tokens adapter.
pub struct GeckoTerminalSource {
    client: Arc<BackoffClient>,
    base_url: String,
    network: String,
}

impl GeckoTerminalSource {
    /// Create an adapter for the given network (e.g. `solana`).
    pub fn new(
        client: Arc<BackoffClient>,
        base_url: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            network: network.into(),
        }
    }

    fn normalize(body: &Value) -> Vec<Token> {
        let Some(records) = body.get("data").and_then(Value::as_array) else {
            return Vec::new();
        };

        records
            .iter()
            .filter_map(|record| {
                let address = record.get("id").and_then(Value::as_str)?.to_string();
                let attributes = record
                    .get("attributes")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_else(Map::new);

                let updated_at = attributes
                    .get("last_priced_at")
                    .and_then(Value::as_str)
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                    .map_or_else(now_ms, |ts| ts.timestamp_millis());

                Some(Token {
                    price: numeric(attributes.get("price_usd")),
                    liquidity: numeric(attributes.get("liquidity_usd")),
                    volume: numeric(attributes.get("volume_usd")),
                    updated_at,
                    sources: vec![SOURCE_NAME.to_string()],
                    extra: attributes,
                    ..Token::new(address)
                })
            })
            .collect()
    }
}

/// Parse a number-or-numeric-string attribute; anything else is 0.
fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[async_trait]
impl TokenSource for GeckoTerminalSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<Token>> {
        let url = format!("{}/api/v2/networks/{}/tokens", self.base_url, self.network);
        let body = self.client.get_json(&url, SOURCE_NAME).await?;
        let tokens = Self::normalize(&body);
        debug!(count = tokens.len(), "GeckoTerminal fetch complete");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_maps_jsonapi_fields() {
        let body = json!({
            "data": [{
                "id": "solana_mint1",
                "attributes": {
                    "price_usd": "1.25",
                    "liquidity_usd": 5000.0,
                    "volume_usd": "750.5",
                    "last_priced_at": "2024-01-15T00:00:00Z",
                    "name": "Token One",
                    "volume_24h": 750.5
                }
            }]
        });

        let tokens = GeckoTerminalSource::normalize(&body);
        assert_eq!(tokens.len(), 1);
        let token = &tokens[0];
        assert_eq!(token.address, "solana_mint1");
        assert!((token.price - 1.25).abs() < f64::EPSILON);
        assert!((token.liquidity - 5000.0).abs() < f64::EPSILON);
        assert!((token.volume - 750.5).abs() < f64::EPSILON);
        assert_eq!(token.updated_at, 1_705_276_800_000);
        assert_eq!(token.sources, vec![SOURCE_NAME]);
        // Attributes pass through for the ranking engine.
        assert_eq!(
            token.extra.get("volume_24h").and_then(Value::as_f64),
            Some(750.5)
        );
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_now() {
        let before = now_ms();
        let body = json!({"data": [{"id": "mint", "attributes": {}}]});
        let tokens = GeckoTerminalSource::normalize(&body);
        assert!(tokens[0].updated_at >= before);
    }

    #[test]
    fn test_records_without_id_are_dropped() {
        let body = json!({"data": [{"attributes": {"price_usd": "9"}}]});
        assert!(GeckoTerminalSource::normalize(&body).is_empty());
    }

    #[test]
    fn test_numeric_parsing_tolerates_garbage() {
        assert!((numeric(Some(&json!("not-a-number"))) - 0.0).abs() < f64::EPSILON);
        assert!((numeric(Some(&json!(null))) - 0.0).abs() < f64::EPSILON);
        assert!((numeric(None) - 0.0).abs() < f64::EPSILON);
    }
}
