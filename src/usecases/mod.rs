//! Usecases Layer - Orchestration Over Ports
//!
//! The aggregation coordinator (fetch → merge → rank → cache), the
//! per-connection registries (subscriptions, liveness), the connection
//! hub that owns them, and the two periodic drivers (broadcast,
//! heartbeat) built as separate cancellable tasks.

pub mod aggregator;
pub mod broadcaster;
pub mod heartbeat;
pub mod hub;
pub mod liveness;
pub mod subscriptions;

pub use aggregator::AggregationService;
pub use broadcaster::BroadcastLoop;
pub use heartbeat::HeartbeatScanner;
pub use hub::{ConnectionHub, ConnectionId};
pub use liveness::LivenessTracker;
pub use subscriptions::SubscriptionRegistry;
