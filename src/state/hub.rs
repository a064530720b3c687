use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::{dao::models::EventId, dto::sse::ServerEvent};

/// Per-event fan-out of [`ServerEvent`]s to every subscribed transport.
///
/// Channels are created lazily on first publish or subscribe; a lagging
/// subscriber loses the oldest messages and is expected to resync.
pub struct EventHub {
    capacity: usize,
    channels: DashMap<EventId, broadcast::Sender<ServerEvent>>,
}

impl EventHub {
    /// Create a hub whose per-event channels buffer `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: DashMap::new(),
        }
    }

    fn sender(&self, event_id: EventId) -> broadcast::Sender<ServerEvent> {
        self.channels
            .entry(event_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Register a subscriber for the messages of `event_id`.
    pub fn subscribe(&self, event_id: EventId) -> broadcast::Receiver<ServerEvent> {
        self.sender(event_id).subscribe()
    }

    /// Send `event` to every current subscriber of `event_id`, ignoring the no-receiver case.
    pub fn publish(&self, event_id: EventId, event: ServerEvent) {
        let _ = self.sender(event_id).send(event);
    }

    /// Number of live subscribers of `event_id`.
    pub fn subscriber_count(&self, event_id: EventId) -> usize {
        self.channels
            .get(&event_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drop the channel of a deleted event; current subscribers see the stream close.
    pub fn remove(&self, event_id: EventId) {
        self.channels.remove(&event_id);
    }
}
