//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! This is operator-facing telemetry about the monitor itself; the dashboard
//! feed lives in `telemetry`.

pub mod logging;
pub mod metrics;
