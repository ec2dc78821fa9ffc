//! API Monitor Library
//!
//! A transparent HTTP proxy that forwards everything to one upstream target
//! and streams live traffic telemetry to dashboard subscribers.

// Core subsystems
pub mod config;
pub mod http;
pub mod monitors;
pub mod proxy;
pub mod telemetry;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::MonitorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{RelayEngine, Target};
pub use telemetry::{EventBus, TelemetryChannel, TelemetryEvent};
