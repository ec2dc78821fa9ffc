//! Metrics collection and exposition.
//!
//! # Metrics
//! - `monitor_requests_total` (counter): forwards by method, status
//! - `monitor_request_duration_seconds` (histogram): time to upstream response head
//! - `monitor_payloads_total` (counter): requests by payload type
//! - `monitor_upstream_failures_total` (counter): unreachable target
//! - `monitor_retargets_total` (counter): target swaps
//! - `monitor_dashboard_subscribers` (gauge): connected dashboards
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::monitors::method_bucket;
use crate::proxy::PayloadType;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    counter!(
        "monitor_requests_total",
        "method" => method_bucket(method).to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("monitor_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_payload(kind: PayloadType) {
    counter!("monitor_payloads_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_upstream_failure() {
    counter!("monitor_upstream_failures_total").increment(1);
}

pub fn record_retarget() {
    counter!("monitor_retargets_total").increment(1);
}

pub fn set_subscribers(count: usize) {
    gauge!("monitor_dashboard_subscribers").set(count as f64);
}
