//! Basic request volume counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;

use crate::proxy::PayloadType;

/// Methods counted under their own name. Any other token is counted as
/// [`OTHER_METHOD`].
const KNOWN_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "CONNECT", "TRACE",
];

pub const OTHER_METHOD: &str = "OTHER";

/// The name `method` is counted under.
pub fn method_bucket(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .copied()
        .find(|known| *known == method)
        .unwrap_or(OTHER_METHOD)
}

/// Point-in-time copy of the traffic counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSnapshot {
    pub total_requests: u64,
    pub json_requests: u64,
    pub xml_requests: u64,
    pub method_counts: BTreeMap<String, u64>,
    /// Epoch milliseconds at process start.
    pub start_time: i64,
    pub uptime_ms: u64,
}

/// Request totals, payload-type totals and per-method counts.
#[derive(Debug)]
pub struct TrafficCounters {
    total: AtomicU64,
    json: AtomicU64,
    xml: AtomicU64,
    methods: DashMap<String, u64>,
    started: Instant,
    start_time: i64,
}

impl TrafficCounters {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            json: AtomicU64::new(0),
            xml: AtomicU64::new(0),
            methods: DashMap::new(),
            started: Instant::now(),
            start_time: Utc::now().timestamp_millis(),
        }
    }

    /// Count one accepted request.
    pub fn record(&self, method: &str, payload: PayloadType) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match payload {
            PayloadType::Json => {
                self.json.fetch_add(1, Ordering::Relaxed);
            }
            PayloadType::Xml => {
                self.xml.fetch_add(1, Ordering::Relaxed);
            }
            PayloadType::Unknown => {}
        }
        *self.methods.entry(method_bucket(method).to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            total_requests: self.total.load(Ordering::Relaxed),
            json_requests: self.json.load(Ordering::Relaxed),
            xml_requests: self.xml.load(Ordering::Relaxed),
            method_counts: self
                .methods
                .iter()
                .map(|item| (item.key().clone(), *item.value()))
                .collect(),
            start_time: self.start_time,
            uptime_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

impl Default for TrafficCounters {
    fn default() -> Self {
        Self::new()
    }
}
