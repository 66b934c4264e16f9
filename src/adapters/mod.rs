//! Adapters Layer - Infrastructure Implementations
//!
//! Concrete implementations of the ports: HTTP upstream sources, the
//! two-tier cache, the Prometheus metrics recorder, and the inbound
//! HTTP/WebSocket surface.

pub mod api;
pub mod cache;
pub mod metrics;
pub mod upstream;
pub mod ws;
