//! Token Source Port - Normalized Upstream Feed Interface
//!
//! Each upstream API (DexScreener, GeckoTerminal, ...) implements this
//! trait behind its own field-mapping adapter, so the merge and ranking
//! algorithms never see a source-specific schema.

use async_trait::async_trait;

use crate::domain::token::Token;

/// One upstream token feed.
///
/// Implementors own the full fetch pipeline for their source: the HTTP
/// request (including bounded 429 backoff), response parsing, and the
/// mapping into the normalized `Token` shape. A failed fetch returns an
/// error; the coordinator isolates it to a per-source warning.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// Human-readable source label, used in warnings and source lists.
    fn name(&self) -> &str;

    /// Fetch and normalize the current token set from this source.
    async fn fetch(&self) -> anyhow::Result<Vec<Token>>;
}
