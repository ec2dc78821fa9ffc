//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::proxy::Target;

/// Root configuration for the monitoring proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Proxy listener and initial upstream target.
    pub proxy: ProxyConfig,

    /// Dashboard listener (WebSocket feed and static files).
    pub dashboard: DashboardConfig,

    /// Aggregator bounds and publish cadence.
    pub monitoring: MonitoringConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Proxy listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind address for proxied traffic (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Upstream every request is forwarded to at startup.
    pub target: Target,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            target: Target::new("localhost", 80),
        }
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard bind address.
    pub bind_address: String,

    /// Directory holding the static dashboard assets, if any.
    pub static_dir: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            static_dir: None,
        }
    }
}

/// Monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Number of response times kept for latency statistics.
    pub latency_window: usize,

    /// Number of endpoints shown in the "recent" view.
    pub recent_endpoints: usize,

    /// Upper bound on distinct (method, path) pairs tracked.
    pub max_tracked_endpoints: usize,

    /// Interval between periodic stats snapshots in milliseconds.
    pub snapshot_interval_ms: u64,

    /// Events buffered per subscriber before it starts lagging.
    pub event_buffer: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            latency_window: 100,
            recent_endpoints: 5,
            max_tracked_endpoints: 10_000,
            snapshot_interval_ms: 1000,
            event_buffer: 256,
        }
    }
}

/// Timeout configuration for upstream connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 10 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}
