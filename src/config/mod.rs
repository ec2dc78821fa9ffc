//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//!
//! With --watch:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → proxy.target sent to the telemetry channel when it changed in the file
//!     → same retarget path as a dashboard command
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DashboardConfig, LogFormat, MonitorConfig, MonitoringConfig, ObservabilityConfig,
    ProxyConfig, TimeoutConfig,
};
pub use validation::ValidationError;
pub use watcher::{ConfigWatcher, FileTarget};
