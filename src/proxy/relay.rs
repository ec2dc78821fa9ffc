//! Request relay.
//!
//! # Responsibilities
//! - Buffer the inbound body and classify it
//! - Forward to the target captured at acceptance time
//! - Stream the upstream response back, rewriting redirect locations
//! - Feed the aggregators and publish one `RequestRecord` per forward
//!
//! # Failure Handling
//! - Connection failures become a 502 plus a synthetic 5xx record
//! - Errors after the response head is sent are logged only
//! - No retries; the connector's connect timeout bounds the wait

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{
        header::{self, HeaderMap, HeaderValue},
        request::Parts,
        Request, Response, StatusCode,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::MonitorConfig;
use crate::monitors::{Aggregators, TrafficCounters};
use crate::observability::metrics;
use crate::proxy::classifier::{classify, PayloadType};
use crate::proxy::status_text::status_message;
use crate::proxy::target::{Target, TargetCell};
use crate::telemetry::bus::EventBus;
use crate::telemetry::events::{AggregateSnapshot, RequestRecord, TelemetryEvent};

/// Forwards requests to the current target and records what happened.
#[derive(Debug)]
pub struct RelayEngine {
    target: TargetCell,
    client: Client<HttpConnector, Body>,
    traffic: TrafficCounters,
    aggregators: Aggregators,
    bus: EventBus,
}

/// What we know about a request before the upstream answers.
struct Exchange {
    method: String,
    path: String,
    body: String,
    content_type: Option<String>,
    payload_type: PayloadType,
    accepted: Instant,
}

impl Exchange {
    fn into_record(self, status_code: u16, elapsed: Duration, message: String) -> RequestRecord {
        RequestRecord {
            method: self.method,
            path: self.path,
            timestamp: Utc::now(),
            body: self.body,
            content_type: self.content_type,
            payload_type: self.payload_type,
            status_code,
            response_time_ms: elapsed.as_millis() as u64,
            response_message: message,
        }
    }
}

impl RelayEngine {
    pub fn new(config: &MonitorConfig, bus: EventBus) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            target: TargetCell::new(config.proxy.target.clone()),
            client,
            traffic: TrafficCounters::new(),
            aggregators: Aggregators::new(&config.monitoring),
            bus,
        }
    }

    /// The target new requests are forwarded to.
    pub fn target(&self) -> Arc<Target> {
        self.target.load()
    }

    /// Swap the target for all subsequently accepted requests and notify
    /// subscribers. Requests already in flight keep their captured target.
    pub fn update_target(&self, target: Target) -> Arc<Target> {
        let previous = self.target.replace(target.clone());
        tracing::info!(from = %previous, to = %target, "Target updated");
        metrics::record_retarget();
        self.bus.publish(TelemetryEvent::ConfigUpdated(target));
        previous
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn aggregators(&self) -> &Aggregators {
        &self.aggregators
    }

    pub fn traffic(&self) -> &TrafficCounters {
        &self.traffic
    }

    /// Read-only projection of every counter. Never mutates state.
    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot::new(
            self.traffic.snapshot(),
            self.aggregators.latency.snapshot(),
            self.aggregators.status.snapshot(),
            self.aggregators.endpoints.snapshot(),
        )
    }

    /// Forward one inbound request and return the response for the caller.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let accepted = Instant::now();
        let (parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(method = %parts.method, uri = %parts.uri, error = %e, "Failed to read request body");
                return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
            }
        };

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let payload_type = classify(&body, content_type.as_deref());
        let method = parts.method.as_str().to_string();
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        self.traffic.record(&method, payload_type);
        metrics::record_payload(payload_type);

        let target = self.target.load();

        tracing::debug!(
            method = %method,
            path = %path,
            payload = %payload_type,
            upstream = %target,
            "Forwarding request"
        );

        let exchange = Exchange {
            method,
            path,
            body: String::from_utf8_lossy(&body).into_owned(),
            content_type,
            payload_type,
            accepted,
        };

        let outbound = match build_outbound(&parts, body, &target) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(upstream = %target, error = %e, "Failed to build upstream request");
                return self.fail(exchange, &target);
            }
        };

        match self.client.request(outbound).await {
            Ok(response) => self.relay_response(exchange, &target, response),
            Err(e) => {
                tracing::error!(upstream = %target, error = %e, "Upstream request failed");
                self.fail(exchange, &target)
            }
        }
    }

    fn relay_response(
        &self,
        exchange: Exchange,
        target: &Target,
        response: Response<Incoming>,
    ) -> Response<Body> {
        let elapsed = exchange.accepted.elapsed();
        let (mut parts, incoming) = response.into_parts();
        let code = parts.status.as_u16();

        if parts.status.is_redirection() && rewrite_location(&mut parts.headers, target.port) {
            tracing::debug!(status = code, "Rewrote redirect location");
        }

        self.aggregators.latency.record(elapsed.as_millis() as u64);
        self.aggregators.status.record(code);
        self.aggregators.endpoints.record(&exchange.method, &exchange.path);
        metrics::record_request(&exchange.method, code, elapsed);

        tracing::debug!(
            method = %exchange.method,
            path = %exchange.path,
            status = code,
            elapsed_ms = elapsed.as_millis() as u64,
            "Upstream responded"
        );
        self.emit(exchange.into_record(code, elapsed, status_message(code)));

        let upstream = target.to_string();
        let stream = Body::new(incoming)
            .into_data_stream()
            .inspect_err(move |e| {
                tracing::warn!(upstream = %upstream, error = %e, "Upstream body failed after response head was sent");
            });

        Response::from_parts(parts, Body::from_stream(stream))
    }

    fn fail(&self, exchange: Exchange, target: &Target) -> Response<Body> {
        let elapsed = exchange.accepted.elapsed();
        let message = format!("502 - Unable to reach {}", target.authority());
        let code = StatusCode::BAD_GATEWAY.as_u16();

        self.aggregators.status.record(code);
        self.aggregators.endpoints.record(&exchange.method, &exchange.path);
        metrics::record_request(&exchange.method, code, elapsed);
        metrics::record_upstream_failure();

        self.emit(exchange.into_record(code, elapsed, message.clone()));
        (StatusCode::BAD_GATEWAY, message).into_response()
    }

    fn emit(&self, record: RequestRecord) {
        self.bus.publish(TelemetryEvent::Request(Box::new(record)));
    }
}

/// Rebuild the inbound request against `target`, keeping method, path,
/// query and headers but pointing `Host` at the target.
fn build_outbound(
    parts: &Parts,
    body: Bytes,
    target: &Target,
) -> Result<Request<Body>, axum::http::Error> {
    let path = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let authority = target.authority();

    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(format!("http://{authority}{path}"));

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            if name != header::HOST {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    builder.header(header::HOST, authority).body(Body::from(body))
}

/// Strip `:<port>` from a redirect `Location` so clients come back through
/// the proxy instead of hitting the target directly.
///
/// Returns true when the header was changed.
pub fn rewrite_location(headers: &mut HeaderMap, port: u16) -> bool {
    let needle = format!(":{port}");
    let rewritten = match headers.get(header::LOCATION).and_then(|v| v.to_str().ok()) {
        Some(location) if location.contains(&needle) => location.replacen(&needle, "", 1),
        _ => return false,
    };

    match HeaderValue::from_str(&rewritten) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
            true
        }
        Err(_) => false,
    }
}
