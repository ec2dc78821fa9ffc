//! Live telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! RelayEngine ── request / configUpdated ──→ bus.rs (broadcast)
//! channel.rs  ── stats every interval ─────→ bus.rs
//!                                              │
//!                                              ▼
//!                          socket.rs (one task per dashboard client)
//!                                              │
//!                     updateConfig ◀───────────┘
//!                          → command.rs (parse, validate)
//!                          → channel.rs → RelayEngine::update_target
//! ```

pub mod bus;
pub mod channel;
pub mod command;
pub mod events;
pub mod socket;

pub use bus::{EventBus, Subscription};
pub use channel::TelemetryChannel;
pub use command::{ClientCommand, CommandError, UpdateConfig};
pub use events::{AggregateSnapshot, ConfigRejection, RequestRecord, TelemetryEvent};
pub use socket::{ws_handler, DashboardState};
