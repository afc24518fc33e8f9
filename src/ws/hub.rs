//! Session hub - outbound queues for every live connection

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::game::ConnectionId;
use crate::ws::protocol::ServerMsg;

/// Messages buffered per connection before new ones are dropped
pub const OUTBOUND_QUEUE: usize = 256;

/// Connection id to outbound queue, shared by the game loop and socket tasks
#[derive(Clone, Default)]
pub struct SessionHub {
    connections: Arc<DashMap<ConnectionId, mpsc::Sender<ServerMsg>>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a queue for `connection_id`, returning the end the socket writer drains
    pub fn register(&self, connection_id: ConnectionId) -> mpsc::Receiver<ServerMsg> {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        self.connections.insert(connection_id, tx);
        rx
    }

    pub fn unregister(&self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queue a message without waiting. Returns false if it was dropped.
    pub fn send(&self, connection_id: ConnectionId, msg: ServerMsg) -> bool {
        let Some(tx) = self.connections.get(&connection_id) else {
            return false;
        };
        match tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %connection_id, "Outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %connection_id, "Outbound queue closed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn messages_reach_registered_connections_only() {
        let hub = SessionHub::new();
        let id = Uuid::new_v4();
        let mut rx = hub.register(id);

        assert!(hub.send(id, ServerMsg::Pong { t: 1 }));
        assert!(!hub.send(Uuid::new_v4(), ServerMsg::Pong { t: 2 }));
        assert!(matches!(rx.try_recv(), Ok(ServerMsg::Pong { t: 1 })));

        hub.unregister(id);
        assert!(hub.is_empty());
        assert!(!hub.send(id, ServerMsg::Pong { t: 3 }));
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let hub = SessionHub::new();
        let id = Uuid::new_v4();
        let _rx = hub.register(id);

        for t in 0..OUTBOUND_QUEUE as u64 {
            assert!(hub.send(id, ServerMsg::Pong { t }));
        }
        assert!(!hub.send(id, ServerMsg::Pong { t: 0 }));
        assert_eq!(hub.len(), 1);
    }
}
