//! Telemetry channel: catch-up on subscribe, periodic snapshots, retargeting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::proxy::{RelayEngine, Target};
use crate::telemetry::bus::Subscription;
use crate::telemetry::command::{parse_command, ClientCommand, CommandError};
use crate::telemetry::events::TelemetryEvent;

/// Bridges the relay engine and dashboard subscribers.
///
/// Reads engine state to build snapshots; writes only through
/// [`RelayEngine::update_target`].
#[derive(Debug)]
pub struct TelemetryChannel {
    engine: Arc<RelayEngine>,
    interval: Duration,
}

impl TelemetryChannel {
    pub fn new(engine: Arc<RelayEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub fn engine(&self) -> &Arc<RelayEngine> {
        &self.engine
    }

    /// Join as a subscriber.
    ///
    /// Returns the live subscription plus the catch-up events (a full stats
    /// snapshot and the current target) the newcomer should see first.
    /// Subscribing happens before the snapshot is taken so nothing published
    /// in between is lost.
    pub fn subscribe(&self) -> (Subscription, Vec<TelemetryEvent>) {
        let subscription = self.engine.bus().subscribe();
        let catch_up = vec![
            TelemetryEvent::Stats(Box::new(self.engine.snapshot())),
            TelemetryEvent::ConfigUpdated((*self.engine.target()).clone()),
        ];
        (subscription, catch_up)
    }

    pub fn subscriber_count(&self) -> usize {
        self.engine.bus().subscriber_count()
    }

    /// Handle a text frame from a subscriber.
    pub fn handle_command(&self, text: &str) -> Result<Target, CommandError> {
        match parse_command(text)? {
            ClientCommand::UpdateConfig(update) => {
                let target = update.into_target()?;
                self.retarget(target.clone());
                Ok(target)
            }
        }
    }

    /// Point the engine at a new target; the engine fans out `configUpdated`.
    pub fn retarget(&self, target: Target) {
        self.engine.update_target(target);
    }

    /// Publish a snapshot if anyone is listening. Returns whether it did.
    pub fn publish_snapshot(&self) -> bool {
        if self.subscriber_count() == 0 {
            return false;
        }
        let snapshot = self.engine.snapshot();
        self.engine.bus().publish(TelemetryEvent::Stats(Box::new(snapshot))) > 0
    }

    /// Periodic snapshot loop. Exits on shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Snapshot publisher starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.publish_snapshot();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Snapshot publisher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Apply targets coming from outside the dashboard (config reloads).
    /// Unchanged targets are ignored.
    pub async fn apply_updates(
        self: Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<Target>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(target) if *self.engine.target() == target => {
                        tracing::debug!(target_addr = %target, "Reloaded target unchanged");
                    }
                    Some(target) => self.retarget(target),
                    None => {
                        let _ = shutdown.recv().await;
                        break;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }
    }
}
