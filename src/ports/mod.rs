//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TokenSource`: one normalized upstream token feed
//! - `CacheStore`: best-effort key/value cache with per-entry TTL

pub mod cache_store;
pub mod token_source;

pub use cache_store::CacheStore;
pub use token_source::TokenSource;
