//! Upstream Adapter Tests — Backoff Behavior Against a Mock Server
//!
//! Exercises the 429-only retry loop and the end-to-end source
//! adapters against httpmock.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use dexfeed::adapters::upstream::{
    BackoffClient, DexScreenerSource, FetchError, GeckoTerminalSource, RetryPolicy,
};
use dexfeed::ports::token_source::TokenSource;

/// Fast policy so exhausted-retry tests finish in milliseconds.
fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(5),
        max_jitter: Duration::ZERO,
    }
}

fn client(policy: RetryPolicy) -> BackoffClient {
    BackoffClient::new(Duration::from_secs(5), policy).unwrap()
}

#[tokio::test]
async fn test_429_is_retried_until_the_budget_is_exhausted() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/data");
            then.status(429);
        })
        .await;

    let client = client(fast_policy(2));
    let result = client.get_json(&server.url("/data"), "TestApi").await;

    assert!(matches!(result, Err(FetchError::RateLimited)));
    // 1 initial attempt + 2 retries.
    mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_non_429_failures_are_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/data");
            then.status(500);
        })
        .await;

    let client = client(fast_policy(5));
    let result = client.get_json(&server.url("/data"), "TestApi").await;

    match result {
        Err(FetchError::Status(status)) => assert_eq!(status.as_u16(), 500),
        other => panic!("expected status error, got {other:?}"),
    }
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_success_returns_parsed_json() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data");
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;

    let client = client(fast_policy(0));
    let body = client.get_json(&server.url("/data"), "TestApi").await.unwrap();

    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_dexscreener_fetch_normalizes_search_results() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/latest/dex/search")
                .query_param("q", "solana");
            then.status(200).json_body(json!({
                "tokens": [
                    {"address": "mint1", "price": 1.5, "volume": 10.0,
                     "updatedAt": 1_700_000_000_000_i64},
                    {"price": 2.0}
                ]
            }));
        })
        .await;

    let source = DexScreenerSource::new(
        Arc::new(client(fast_policy(0))),
        server.base_url(),
        "solana",
    );
    let tokens = source.fetch().await.unwrap();

    // The address-less record is dropped.
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].address, "mint1");
    assert_eq!(tokens[0].sources, vec!["DexScreener"]);
}

#[tokio::test]
async fn test_geckoterminal_fetch_maps_attributes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2/networks/solana/tokens");
            then.status(200).json_body(json!({
                "data": [
                    {"id": "mint2", "attributes": {
                        "price_usd": "2.25",
                        "liquidity_usd": 1000.0,
                        "volume_usd": "50.5",
                        "last_priced_at": "2023-11-14T22:13:20Z"
                    }}
                ]
            }));
        })
        .await;

    let source = GeckoTerminalSource::new(
        Arc::new(client(fast_policy(0))),
        server.base_url(),
        "solana",
    );
    let tokens = source.fetch().await.unwrap();

    assert_eq!(tokens.len(), 1);
    let token = &tokens[0];
    assert_eq!(token.address, "mint2");
    assert!((token.price - 2.25).abs() < f64::EPSILON);
    assert!((token.liquidity - 1000.0).abs() < f64::EPSILON);
    assert!((token.volume - 50.5).abs() < f64::EPSILON);
    assert_eq!(token.updated_at, 1_700_000_000_000);
    assert_eq!(token.sources, vec!["GeckoTerminal"]);
}

#[tokio::test]
async fn test_rate_limited_source_surfaces_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/latest/dex/search");
            then.status(429);
        })
        .await;

    let source = DexScreenerSource::new(
        Arc::new(client(fast_policy(1))),
        server.base_url(),
        "solana",
    );

    assert!(source.fetch().await.is_err());
}
