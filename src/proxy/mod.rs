//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → relay.rs (buffer body)
//!     → classifier.rs (json / xml / unknown)
//!     → target.rs (capture current target)
//!     → upstream via hyper client
//!     → relay.rs (rewrite Location, stream body back)
//!     → aggregators + RequestRecord on the event bus
//! ```

pub mod classifier;
pub mod relay;
pub mod status_text;
pub mod target;

pub use classifier::{classify, PayloadType};
pub use relay::{rewrite_location, RelayEngine};
pub use status_text::status_message;
pub use target::{Target, TargetCell};
