//! WebSocket transport for dashboard subscribers.
//!
//! # Data Flow
//! ```text
//! Dashboard ←── stats / request / configUpdated (JSON text frames) ──── bus
//! Dashboard ─── updateConfig ──→ TelemetryChannel::handle_command
//! ```
//!
//! A rejected command is answered with `configError` on that socket only.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};

use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::telemetry::channel::TelemetryChannel;
use crate::telemetry::events::{ConfigRejection, TelemetryEvent};

/// State shared by dashboard handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub channel: Arc<TelemetryChannel>,
    pub shutdown: Shutdown,
}

/// Upgrade handler mounted at `/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

async fn serve_subscriber(socket: WebSocket, state: DashboardState) {
    let (mut sender, mut receiver) = socket.split();
    let mut shutdown = state.shutdown.subscribe();
    let (mut subscription, catch_up) = state.channel.subscribe();
    let id = subscription.id();

    let connected = state.channel.subscriber_count();
    metrics::set_subscribers(connected);
    if connected == 1 {
        tracing::info!(subscriber = %id, "Client connected to monitoring interface");
    } else {
        tracing::debug!(subscriber = %id, connected, "Client connected");
    }

    let mut open = true;
    for event in &catch_up {
        if send_event(&mut sender, event).await.is_err() {
            open = false;
            break;
        }
    }

    while open {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => {
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match state.channel.handle_command(text.as_str()) {
                        Ok(target) => {
                            tracing::info!(subscriber = %id, target_addr = %target, "Retarget requested by dashboard");
                        }
                        Err(e) => {
                            tracing::warn!(subscriber = %id, error = %e, "Rejected dashboard command");
                            let reply = TelemetryEvent::ConfigError(ConfigRejection {
                                message: e.to_string(),
                            });
                            if send_event(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(subscriber = %id, error = %e, "WebSocket receive error");
                    break;
                }
            },
            _ = shutdown.recv() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    drop(subscription);
    let remaining = state.channel.subscriber_count();
    metrics::set_subscribers(remaining);
    if remaining == 0 {
        tracing::info!("All clients disconnected from monitoring interface");
    } else {
        tracing::debug!(subscriber = %id, remaining, "Client disconnected");
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &TelemetryEvent,
) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(text) => sender.send(Message::Text(text.into())).await,
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
            Ok(())
        }
    }
}
