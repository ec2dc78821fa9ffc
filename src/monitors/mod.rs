//! Traffic statistics subsystem.
//!
//! # Data Flow
//! ```text
//! relay engine (one completed forward)
//!     → traffic.rs      (totals, payload types, methods)
//!     → latency.rs      (bounded response time window)
//!     → status_codes.rs (class + exact code counters)
//!     → endpoints.rs    ((method, path) hit counters)
//!
//! telemetry channel
//!     → snapshot() on each aggregator (read only)
//! ```
//!
//! Every aggregator synchronizes internally and is shared through `Arc`.
//! Snapshots across aggregators are not taken atomically.

pub mod endpoints;
pub mod latency;
pub mod status_codes;
pub mod traffic;

pub use endpoints::{EndpointAggregator, EndpointSnapshot, EndpointView};
pub use latency::{LatencyAggregator, LatencySnapshot};
pub use status_codes::{StatusAggregator, StatusSnapshot};
pub use traffic::{method_bucket, TrafficCounters, TrafficSnapshot, OTHER_METHOD};

use crate::config::MonitoringConfig;

/// The three response aggregators, owned together by the relay engine.
#[derive(Debug)]
pub struct Aggregators {
    pub latency: LatencyAggregator,
    pub status: StatusAggregator,
    pub endpoints: EndpointAggregator,
}

impl Aggregators {
    pub fn new(config: &MonitoringConfig) -> Self {
        Self {
            latency: LatencyAggregator::new(config.latency_window),
            status: StatusAggregator::new(),
            endpoints: EndpointAggregator::new(
                config.recent_endpoints,
                config.max_tracked_endpoints,
            ),
        }
    }
}

impl Default for Aggregators {
    fn default() -> Self {
        Self::new(&MonitoringConfig::default())
    }
}
