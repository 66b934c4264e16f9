//! Domain layer - Core aggregation models and algorithms.
//!
//! Pure token-consolidation logic for the aggregation service: the
//! normalized token record, the duplicate-reconciliation merge, and the
//! multi-key ranking/pagination engine. No I/O here (hexagonal inner
//! ring); everything is serializable and testable in isolation.

pub mod merge;
pub mod protocol;
pub mod rank;
pub mod token;

// Re-export core types for convenience
pub use merge::merge_tokens;
pub use protocol::{ClientMessage, ServerMessage, SubscriptionFilters};
pub use token::{AggregatedTokens, AggregationParams, TimeWindow, Token};
