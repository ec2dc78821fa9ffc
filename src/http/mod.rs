//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! proxy listener
//!     → server.rs (axum, fallback route)
//!     → proxy::RelayEngine::forward
//!
//! dashboard listener
//!     → server.rs (axum)
//!     → /ws → telemetry::socket
//!     → everything else → static dashboard files
//! ```

pub mod server;

pub use server::{HttpServer, ServerError};
