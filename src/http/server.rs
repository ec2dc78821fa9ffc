//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Bind the proxy and dashboard listeners
//! - Build the proxy router (every method and path → relay engine)
//! - Build the dashboard router (WebSocket feed + static assets)
//! - Run the snapshot publisher and target-update consumer
//! - Drain both servers on shutdown

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::MonitorConfig;
use crate::lifecycle::{shutdown::shutdown_signal, Shutdown};
use crate::proxy::{RelayEngine, Target};
use crate::telemetry::{ws_handler, DashboardState, EventBus, TelemetryChannel};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// The proxy listener plus the dashboard listener, sharing one relay engine.
pub struct HttpServer {
    config: MonitorConfig,
    engine: Arc<RelayEngine>,
    channel: Arc<TelemetryChannel>,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: MonitorConfig) -> Self {
        let bus = EventBus::new(config.monitoring.event_buffer);
        let engine = Arc::new(RelayEngine::new(&config, bus));
        let channel = Arc::new(TelemetryChannel::new(
            engine.clone(),
            Duration::from_millis(config.monitoring.snapshot_interval_ms),
        ));

        Self {
            config,
            engine,
            channel,
        }
    }

    /// Bind the proxy and dashboard addresses from the configuration.
    pub async fn bind(config: &MonitorConfig) -> Result<(TcpListener, TcpListener), ServerError> {
        let proxy = bind_one(&config.proxy.bind_address).await?;
        let dashboard = bind_one(&config.dashboard.bind_address).await?;
        Ok((proxy, dashboard))
    }

    pub fn engine(&self) -> Arc<RelayEngine> {
        self.engine.clone()
    }

    pub fn channel(&self) -> Arc<TelemetryChannel> {
        self.channel.clone()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Router that relays every request, whatever its method or path.
    pub fn proxy_router(&self) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(self.engine.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Router for the dashboard: `/ws` feed plus optional static files.
    pub fn dashboard_router(&self, shutdown: Shutdown) -> Router {
        let state = DashboardState {
            channel: self.channel.clone(),
            shutdown,
        };

        let router = Router::new().route("/ws", get(ws_handler)).with_state(state);
        let router = match &self.config.dashboard.static_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };
        router.layer(TraceLayer::new_for_http())
    }

    /// Serve both listeners until `shutdown` fires, then drain in-flight
    /// requests and return.
    ///
    /// `target_updates` carries targets from outside the dashboard (config
    /// reloads); pass a receiver whose sender is dropped if there are none.
    pub async fn run(
        self,
        proxy_listener: TcpListener,
        dashboard_listener: TcpListener,
        target_updates: mpsc::UnboundedReceiver<Target>,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        tracing::info!(
            proxy = %proxy_listener.local_addr()?,
            dashboard = %dashboard_listener.local_addr()?,
            upstream = %self.engine.target(),
            "HTTP servers starting"
        );

        let publisher = tokio::spawn(self.channel.clone().run(shutdown.subscribe()));
        let updater = tokio::spawn(
            self.channel
                .clone()
                .apply_updates(target_updates, shutdown.subscribe()),
        );

        let proxy = axum::serve(proxy_listener, self.proxy_router())
            .with_graceful_shutdown(shutdown_signal(shutdown.subscribe()));
        let dashboard = axum::serve(dashboard_listener, self.dashboard_router(shutdown.clone()))
            .with_graceful_shutdown(shutdown_signal(shutdown.subscribe()));

        let (proxy_result, dashboard_result) =
            tokio::join!(proxy.into_future(), dashboard.into_future());

        let _ = publisher.await;
        let _ = updater.await;

        proxy_result?;
        dashboard_result?;

        tracing::info!("HTTP servers stopped");
        Ok(())
    }
}

async fn bind_one(address: &str) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = address.parse().map_err(|e| ServerError::Bind {
        address: address.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;

    TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        address: address.to_string(),
        source,
    })
}

async fn proxy_handler(
    State(engine): State<Arc<RelayEngine>>,
    request: Request<Body>,
) -> Response<Body> {
    engine.forward(request).await
}
