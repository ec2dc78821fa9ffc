//! API Monitor
//!
//! Transparent HTTP forwarding proxy with a live traffic dashboard.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                   API MONITOR                    │
//!                        │                                                  │
//!   Client Request       │  ┌─────────┐    ┌──────────────┐                 │
//!   ─────────────────────┼─▶│  proxy  │───▶│    relay     │─────────────────┼──▶ Target
//!                        │  │ listener│    │   engine     │                 │
//!   Client Response      │  └─────────┘    │ classify     │                 │
//!   ◀────────────────────┼─────────────────│ rewrite 3xx  │◀────────────────┼─── Target
//!                        │                 └──────┬───────┘                 │
//!                        │                        │ records                 │
//!                        │                        ▼                         │
//!                        │  ┌────────────┐  ┌──────────┐  ┌──────────────┐   │
//!                        │  │ monitors   │◀─│event bus │─▶│  telemetry   │   │
//!                        │  │ latency    │  └──────────┘  │  channel     │   │
//!                        │  │ status     │                │ stats ticker │   │
//!                        │  │ endpoints  │                └──────┬───────┘   │
//!                        │  └────────────┘                       │           │
//!                        │                                 dashboard ws     │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use api_monitor::config::{load_config, validation::validate_config, ConfigError, MonitorConfig};
use api_monitor::lifecycle::startup;
use api_monitor::observability::logging;

#[derive(Parser)]
#[command(name = "api-monitor", version)]
#[command(about = "Transparent HTTP proxy with a live traffic dashboard", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Proxy bind address, e.g. 0.0.0.0:3000.
    #[arg(short, long)]
    listen: Option<String>,

    /// Dashboard bind address, e.g. 0.0.0.0:9000.
    #[arg(short, long)]
    dashboard: Option<String>,

    /// Upstream host to forward to.
    #[arg(long)]
    target_host: Option<String>,

    /// Upstream port to forward to.
    #[arg(long)]
    target_port: Option<u16>,

    /// Apply target changes made to the config file while running.
    #[arg(long, requires = "config")]
    watch: bool,
}

impl Cli {
    fn load(&self) -> Result<MonitorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => MonitorConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.proxy.bind_address = listen.clone();
        }
        if let Some(dashboard) = &self.dashboard {
            config.dashboard.bind_address = dashboard.clone();
        }
        if let Some(host) = &self.target_host {
            config.proxy.target.host = host.clone();
        }
        if let Some(port) = self.target_port {
            config.proxy.target.port = port;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("api-monitor: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    logging::install_panic_hook();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        proxy = %config.proxy.bind_address,
        dashboard = %config.dashboard.bind_address,
        upstream = %config.proxy.target,
        "api-monitor starting"
    );

    let watch = if cli.watch { cli.config.clone() } else { None };
    match startup::start(config, watch).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
