//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api_monitor::config::MonitorConfig;
use api_monitor::proxy::Target;
use api_monitor::{HttpServer, RelayEngine, Shutdown, TelemetryEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A canned upstream response.
#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Read one HTTP/1.1 request (head plus Content-Length body) off the socket.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a programmable mock backend on an ephemeral port.
///
/// The closure receives the raw request text and decides the response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let response = f(request).await;

                        let mut head = format!(
                            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                            response.status,
                            reason(response.status),
                            response.body.len()
                        );
                        for (name, value) in &response.headers {
                            head.push_str(&format!("{name}: {value}\r\n"));
                        }
                        head.push_str("\r\n");

                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(response.body.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that always returns the same response.
pub async fn start_mock_backend(response: MockResponse) -> SocketAddr {
    start_programmable_backend(move |_| {
        let response = response.clone();
        async move { response }
    })
    .await
}

/// A mock backend that echoes the raw request it received as the body.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|request| async move { MockResponse::ok(request) }).await
}

/// A backend that promises `declared` body bytes, sends `sent` of them, then
/// closes the connection.
pub async fn start_truncating_backend(declared: usize, sent: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\n\r\n");
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![b'x'; sent]).await;
                let _ = socket.flush().await;
                drop(socket);
            });
        }
    });

    addr
}

/// A port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let free = TcpListener::bind("127.0.0.1:0").await.unwrap();
    free.local_addr().unwrap().port()
}

pub fn target_for(addr: SocketAddr) -> Target {
    Target::new(addr.ip().to_string(), addr.port())
}

/// A running monitor on ephemeral ports.
pub struct TestMonitor {
    pub proxy_addr: SocketAddr,
    pub dashboard_addr: SocketAddr,
    pub engine: Arc<RelayEngine>,
    pub target_updates: mpsc::UnboundedSender<Target>,
    pub shutdown: Shutdown,
}

impl TestMonitor {
    pub fn proxy_url(&self, path: &str) -> String {
        format!("http://{}{}", self.proxy_addr, path)
    }

    pub fn dashboard_ws(&self) -> String {
        format!("ws://{}/ws", self.dashboard_addr)
    }
}

/// Start the monitor against `target` with a fast snapshot interval.
pub async fn start_monitor(target: Target) -> TestMonitor {
    let mut config = MonitorConfig::default();
    config.proxy.target = target;
    config.monitoring.snapshot_interval_ms = 200;
    config.timeouts.connect_secs = 2;
    start_monitor_with(config).await
}

pub async fn start_monitor_with(config: MonitorConfig) -> TestMonitor {
    let proxy_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dashboard_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = proxy_listener.local_addr().unwrap();
    let dashboard_addr = dashboard_listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let engine = server.engine();
    let shutdown = Shutdown::new();
    let (target_updates, updates_rx) = mpsc::unbounded_channel();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server
            .run(proxy_listener, dashboard_listener, updates_rx, server_shutdown)
            .await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestMonitor {
        proxy_addr,
        dashboard_addr,
        engine,
        target_updates,
        shutdown,
    }
}

/// Client that never reuses connections, follows no redirects and ignores
/// any system proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait for the next `request` event on a subscription, skipping others.
pub async fn next_request_event(
    sub: &mut api_monitor::telemetry::Subscription,
) -> api_monitor::telemetry::RequestRecord {
    let wait = async {
        loop {
            match sub.recv().await {
                Some(TelemetryEvent::Request(record)) => return *record,
                Some(_) => continue,
                None => panic!("event bus closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for a request event")
}
