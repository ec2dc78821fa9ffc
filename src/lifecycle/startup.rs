//! Startup orchestration.
//!
//! Order: metrics exporter → listeners → config watcher → signal task →
//! servers. Any startup error is fatal.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{ConfigWatcher, MonitorConfig};
use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Bring the monitor up and block until it has shut down.
///
/// When `watch` is set, target changes in that config file are applied live.
pub async fn start(config: MonitorConfig, watch: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let (proxy_listener, dashboard_listener) = HttpServer::bind(&config).await?;

    // The watcher handle must outlive the servers.
    let (_watcher, target_updates) = match watch {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_termination().await;
        trigger.trigger();
    });

    HttpServer::new(config)
        .run(proxy_listener, dashboard_listener, target_updates, shutdown)
        .await?;

    Ok(())
}
