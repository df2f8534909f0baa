//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use domains::{EventPublisher, TicketEvent};

pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`TicketEvent`]s to any number of listeners. Publishing with
/// no listener attached is a no-op; slow listeners observe `Lagged`.
#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<TicketEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for BroadcastEventBus {
    fn publish(&self, event: TicketEvent) {
        let name = event.name();
        let uid = event.ticket_uid();
        match self.sender.send(event) {
            Ok(listeners) => debug!(event = name, ticket_uid = uid, listeners, "event published"),
            Err(_) => trace!(event = name, ticket_uid = uid, "event dropped, no listeners"),
        }
    }
}
