//! Events published to dashboard subscribers.
//!
//! On the wire every event is a JSON object `{"event": <name>, "data": <payload>}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitors::{EndpointSnapshot, LatencySnapshot, StatusSnapshot, TrafficSnapshot};
use crate::proxy::{PayloadType, Target};

/// Outcome of one forwarded (or failed) request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub method: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    pub body: String,
    pub content_type: Option<String>,
    pub payload_type: PayloadType,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub response_message: String,
}

/// Combined read-only view of all telemetry state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub total_requests: u64,
    pub json_requests: u64,
    pub xml_requests: u64,
    pub method_counts: BTreeMap<String, u64>,
    pub start_time: i64,
    pub uptime_ms: u64,
    pub response_times: LatencySnapshot,
    pub status_codes: StatusSnapshot,
    pub endpoints: EndpointSnapshot,
}

impl AggregateSnapshot {
    pub fn new(
        traffic: TrafficSnapshot,
        response_times: LatencySnapshot,
        status_codes: StatusSnapshot,
        endpoints: EndpointSnapshot,
    ) -> Self {
        Self {
            total_requests: traffic.total_requests,
            json_requests: traffic.json_requests,
            xml_requests: traffic.xml_requests,
            method_counts: traffic.method_counts,
            start_time: traffic.start_time,
            uptime_ms: traffic.uptime_ms,
            response_times,
            status_codes,
            endpoints,
        }
    }
}

/// Reply to a subscriber whose command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRejection {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum TelemetryEvent {
    Stats(Box<AggregateSnapshot>),
    Request(Box<RequestRecord>),
    ConfigUpdated(Target),
    ConfigError(ConfigRejection),
}

impl TelemetryEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::Stats(_) => "stats",
            TelemetryEvent::Request(_) => "request",
            TelemetryEvent::ConfigUpdated(_) => "configUpdated",
            TelemetryEvent::ConfigError(_) => "configError",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
