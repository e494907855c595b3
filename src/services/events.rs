//! Event system for content changes
//!
//! Services emit an event after every successful write. The logging
//! listener turns them into an audit trail.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use super::Collection;

/// Content events emitted by services
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    Created {
        collection: Collection,
        id: i64,
        title: String,
    },
    Updated {
        collection: Collection,
        id: i64,
        title: String,
    },
    Deleted {
        collection: Collection,
        id: i64,
    },
    SettingsUpdated,
    StructureSaved {
        positions: usize,
        uploaded: usize,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &ContentEvent);
}

/// Event bus for broadcasting content events
pub struct EventBus {
    sender: broadcast::Sender<ContentEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: ContentEvent) {
        trace!(event = ?event, "Emitting content event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Audit log listener
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &ContentEvent) {
        match event {
            ContentEvent::Created { collection, id, title } => {
                info!(collection = %collection, id = id, title = %title, "Content created");
            }
            ContentEvent::Updated { collection, id, title } => {
                info!(collection = %collection, id = id, title = %title, "Content updated");
            }
            ContentEvent::Deleted { collection, id } => {
                info!(collection = %collection, id = id, "Content deleted");
            }
            ContentEvent::SettingsUpdated => {
                info!("School settings updated");
            }
            ContentEvent::StructureSaved { positions, uploaded } => {
                info!(positions = positions, uploaded = uploaded, "Organization structure saved");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(ContentEvent::Deleted {
            collection: Collection::Galleries,
            id: 7,
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");
        assert_eq!(
            event,
            ContentEvent::Deleted {
                collection: Collection::Galleries,
                id: 7
            }
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(ContentEvent::SettingsUpdated);
    }
}
