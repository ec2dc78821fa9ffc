//! Publish/subscribe fan-out for telemetry events.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::telemetry::events::TelemetryEvent;

/// Broadcast bus decoupling event producers from dashboard transports.
///
/// Publishing with nobody subscribed is a no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TelemetryEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns the number of subscribers that will receive it.
    pub fn publish(&self, event: TelemetryEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Register a new subscriber. Dropping the handle unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Handle for one subscriber's event stream.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    rx: broadcast::Receiver<TelemetryEvent>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the bus is gone.
    ///
    /// A subscriber that falls behind skips the events it missed.
    pub async fn recv(&mut self) -> Option<TelemetryEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = %self.id, skipped, "Subscriber lagging, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
