//! Upstream target and its swappable cell.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// The upstream host/port all traffic is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, used for the outbound URI and `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Single-writer, many-reader cell holding the current target.
///
/// Readers get an `Arc` snapshot, so a request keeps the target it captured
/// even if a retarget lands while it is in flight.
#[derive(Debug)]
pub struct TargetCell {
    inner: ArcSwap<Target>,
}

impl TargetCell {
    pub fn new(target: Target) -> Self {
        Self {
            inner: ArcSwap::from_pointee(target),
        }
    }

    pub fn load(&self) -> Arc<Target> {
        self.inner.load_full()
    }

    /// Replace the target wholesale, returning the previous one.
    pub fn replace(&self, target: Target) -> Arc<Target> {
        self.inner.swap(Arc::new(target))
    }
}
