//! Notification hub and the records it carries.
//!
//! `EventHub` is built once at the composition root and cloned into every
//! component that broadcasts. Each subscriber owns its own receiver, so a slow
//! subscriber lags (and drops old records) without blocking the others.

pub mod events;

use tokio::sync::broadcast;
use tracing::trace;

use events::AssistantEvent;

/// Broadcast channel capacity: records buffered for slow subscribers.
const BROADCAST_CAP: usize = 256;

/// Cloneable fan-out handle for `AssistantEvent`s.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<AssistantEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(BROADCAST_CAP)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: AssistantEvent) {
        if self.tx.send(event).is_err() {
            trace!("no subscribers for assistant event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
