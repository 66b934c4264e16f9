//! Aggregation Coordinator - One Fetch→Merge→Rank→Cache Cycle
//!
//! The single entry point behind both the pull API and the broadcast
//! loop. Checks the tiered cache, fans out to every configured source
//! as an independent task, folds per-source failures into warnings
//! instead of hard errors, merges and ranks the surviving subset, and
//! writes the result back under the param-derived key.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::adapters::cache::TieredCache;
use crate::adapters::metrics::ServiceMetrics;
use crate::domain::merge::merge_tokens;
use crate::domain::rank;
use crate::domain::token::{AggregatedTokens, AggregationParams, Token};
use crate::ports::token_source::TokenSource;

/// Orchestrates aggregation cycles over the configured sources.
pub struct AggregationService {
    sources: Vec<Arc<dyn TokenSource>>,
    cache: Arc<TieredCache>,
    metrics: Arc<ServiceMetrics>,
}

impl AggregationService {
    /// Build a coordinator over the given sources and cache.
    pub fn new(
        sources: Vec<Arc<dyn TokenSource>>,
        cache: Arc<TieredCache>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            sources,
            cache,
            metrics,
        }
    }

    /// Run one aggregation cycle for the given params.
    ///
    /// Per-source failures never fail the cycle; they surface as a
    /// joined warning string on the result. Only a coordinator-internal
    /// fault returns an error.
    pub async fn aggregate(&self, params: &AggregationParams) -> Result<AggregatedTokens> {
        let key = params.cache_key();

        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_str::<AggregatedTokens>(&cached) {
                Ok(result) => {
                    debug!(key = %key, "Serving cached aggregation result");
                    return Ok(result);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Corrupt cache entry, refetching");
                }
            }
        }

        info!(key = %key, sources = self.sources.len(), "Cache miss, fetching upstreams");
        let (tokens, warnings) = self.fetch_all().await;

        let merged = merge_tokens(tokens);
        let (page, next_cursor) = rank::rank(merged, params);

        let result = AggregatedTokens {
            tokens: page,
            next_cursor,
            warning: (!warnings.is_empty()).then(|| warnings.join("; ")),
        };

        match serde_json::to_string(&result) {
            Ok(json) => self.cache.set(&key, &json).await,
            Err(e) => warn!(error = %e, "Failed to serialize result for caching"),
        }

        Ok(result)
    }

    /// Fan out to every source concurrently with isolated failures.
    ///
    /// Each fetch runs in its own spawned task, so one source's backoff
    /// delay or panic never blocks or cancels a sibling.
    async fn fetch_all(&self) -> (Vec<Token>, Vec<String>) {
        let mut handles = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let name = source.name().to_string();
            let source = Arc::clone(source);
            handles.push((name, tokio::spawn(async move { source.fetch().await })));
        }

        let mut tokens = Vec::new();
        let mut warnings = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(batch)) => {
                    debug!(source = %name, count = batch.len(), "Upstream fetch succeeded");
                    tokens.extend(batch);
                }
                Ok(Err(e)) => {
                    error!(source = %name, error = %e, "Upstream fetch failed");
                    self.metrics.record_upstream_failure(&name);
                    warnings.push(format!("{name} is currently unavailable"));
                }
                Err(e) => {
                    error!(source = %name, error = %e, "Upstream fetch task panicked");
                    self.metrics.record_upstream_failure(&name);
                    warnings.push(format!("{name} is currently unavailable"));
                }
            }
        }

        (tokens, warnings)
    }
}
