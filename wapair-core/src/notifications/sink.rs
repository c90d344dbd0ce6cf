//! Notification sinks

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::types::LifecycleEvent;

/// Receiver of lifecycle events
///
/// Sinks must not fail: delivery problems are theirs to log.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: LifecycleEvent);
}

/// Fans events out to any number of subscribers
pub struct BroadcastNotifier {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn notify(&self, event: LifecycleEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, event: LifecycleEvent) {
        let id = event.session_id();
        match &event {
            LifecycleEvent::Failed { .. } | LifecycleEvent::RecordFailed { .. } => {
                warn!(session_id = %id, "{}", event.message());
            }
            _ => info!(session_id = %id, "{}", event.message()),
        }
    }
}
