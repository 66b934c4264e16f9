//! DexScreener Source - Search-Endpoint Token Feed
//!
//! DexScreener's search endpoint already reports records in roughly the
//! normalized shape (address/price/liquidity/volume/updatedAt), so the
//! field mapping is a direct deserialization with the source label
//! stamped on. Records without an address are dropped with a warning.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use super::BackoffClient;
use crate::domain::token::Token;
use crate::ports::token_source::TokenSource;

/// Source label used in warnings and merged source lists.
pub const SOURCE_NAME: &str = "DexScreener";

/// DexScreener search-endpoint adapter.
pub struct DexScreenerSource {
    client: Arc<BackoffClient>,
    base_url: String,
    query: String,
}

impl DexScreenerSource {
    /// Create an adapter against the given API base URL.
    pub fn new(client: Arc<BackoffClient>, base_url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            query: query.into(),
        }
    }

    fn normalize(body: &Value) -> Vec<Token> {
        let Some(records) = body.get("tokens").and_then(Value::as_array) else {
            return Vec::new();
        };

        records
            .iter()
            .filter_map(|record| {
                match serde_json::from_value::<Token>(record.clone()) {
                    Ok(mut token) => {
                        token.sources = vec![SOURCE_NAME.to_string()];
                        Some(token)
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed DexScreener record");
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl TokenSource for DexScreenerSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Vec<Token>> {
        let url = Url::parse_with_params(
            &format!("{}/latest/dex/search", self.base_url),
            &[("q", self.query.as_str())],
        )
        .context("Invalid DexScreener URL")?;

        let body = self.client.get_json(url.as_str(), SOURCE_NAME).await?;
        let tokens = Self::normalize(&body);
        debug!(count = tokens.len(), "DexScreener fetch complete");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_stamps_source_label() {
        let body = json!({
            "tokens": [
                {"address": "mint1", "price": 1.5, "liquidity": 10.0, "volume": 5.0,
                 "updatedAt": 1_700_000_000_000_i64, "name": "Token One"},
                {"address": "mint2", "price": 2.0}
            ]
        });

        let tokens = DexScreenerSource::normalize(&body);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].address, "mint1");
        assert_eq!(tokens[0].sources, vec![SOURCE_NAME]);
        assert_eq!(
            tokens[0].extra.get("name").and_then(Value::as_str),
            Some("Token One")
        );
        // Missing numeric fields default to zero.
        assert!((tokens[1].liquidity - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_drops_records_without_address() {
        let body = json!({"tokens": [{"price": 3.0}, {"address": "ok"}]});
        let tokens = DexScreenerSource::normalize(&body);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].address, "ok");
    }

    #[test]
    fn test_normalize_handles_missing_tokens_key() {
        assert!(DexScreenerSource::normalize(&json!({})).is_empty());
        assert!(DexScreenerSource::normalize(&json!({"tokens": null})).is_empty());
    }
}
