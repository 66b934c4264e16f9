//! Upstream Fetchers - HTTP Clients with Bounded 429 Backoff
//!
//! One `TokenSource` adapter per upstream API, all sharing the
//! `BackoffClient`: a reqwest wrapper that retries HTTP 429 with
//! exponential backoff plus uniform jitter and propagates every other
//! failure immediately. Retry loops are per-request, so one source's
//! backoff never delays another source's fetch.

pub mod dexscreener;
pub mod geckoterminal;

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

pub use dexscreener::DexScreenerSource;
pub use geckoterminal::GeckoTerminalSource;

/// Upstream fetch failure taxonomy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429 persisted through every retry (transient upstream error).
    #[error("rate limited (HTTP 429), retries exhausted")]
    RateLimited,
    /// Any non-success, non-429 status (permanent upstream error).
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    /// Connection, timeout, or body decode failure (permanent).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Bounded exponential-backoff-with-jitter retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (5 means 6 attempts total).
    pub max_retries: u32,
    /// Base delay; doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay for the given zero-based attempt with a fixed
    /// jitter sample: `base_delay * 2^attempt + jitter`.
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .saturating_add(jitter)
    }

    /// Draw a uniform jitter in `[0, max_jitter)`.
    fn sample_jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..max_ms))
    }
}

/// Shared HTTP client with the 429 retry loop.
pub struct BackoffClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl BackoffClient {
    /// Build the underlying reqwest client.
    pub fn new(timeout: Duration, policy: RetryPolicy) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()?;
        Ok(Self { http, policy })
    }

    /// GET a JSON document, retrying only on HTTP 429.
    ///
    /// Transport errors and non-429 statuses propagate on the first
    /// occurrence; a 429 on the final attempt propagates as
    /// `FetchError::RateLimited`.
    pub async fn get_json(&self, url: &str, api_name: &str) -> Result<Value, FetchError> {
        let mut attempt = 0u32;
        loop {
            let response = self.http.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.policy.max_retries {
                let jitter = self.policy.sample_jitter();
                let delay = self.policy.delay_for(attempt, jitter);
                warn!(
                    api = api_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    jitter_ms = jitter.as_millis() as u64,
                    "Rate limited, retrying with backoff"
                );
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(FetchError::RateLimited);
            }
            return Err(FetchError::Status(status));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        let jitter = Duration::from_millis(250);

        assert_eq!(policy.delay_for(0, jitter), Duration::from_millis(750));
        assert_eq!(policy.delay_for(1, jitter), Duration::from_millis(1_250));
        assert_eq!(policy.delay_for(2, jitter), Duration::from_millis(2_250));
        assert_eq!(policy.delay_for(5, jitter), Duration::from_millis(16_250));
    }

    #[test]
    fn test_backoff_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy {
            max_retries: 64,
            base_delay: Duration::from_secs(u64::MAX / 2),
            max_jitter: Duration::ZERO,
        };
        // Absurd configs clamp rather than panic.
        let delay = policy.delay_for(40, Duration::ZERO);
        assert!(delay >= Duration::from_secs(u64::MAX / 2));
    }

    #[test]
    fn test_zero_jitter_bound_yields_zero() {
        let policy = RetryPolicy {
            max_jitter: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.sample_jitter(), Duration::ZERO);
    }

    #[test]
    fn test_sampled_jitter_stays_below_bound() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            assert!(policy.sample_jitter() < policy.max_jitter);
        }
    }
}
