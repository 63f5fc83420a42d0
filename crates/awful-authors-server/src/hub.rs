//! Per-connection outbound queues.
//!
//! Each WebSocket connection registers a bounded channel; the room registry
//! delivers events through [`Notifier`], which serializes each frame once per
//! recipient and queues it without blocking. A connection whose queue fills
//! up is dropped from the hub, which ends its socket; the client
//! resynchronizes by reconnecting and rejoining.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use awful_authors_core::event::DomainEvent;
use awful_authors_core::ids::ConnectionId;
use awful_authors_core::notifier::Notifier;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::protocol::ServerMessage;

/// Frames buffered per connection before it is closed.
pub const CHANNEL_CAPACITY: usize = 256;

/// Routes serialized frames to live connections.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    senders: RwLock<HashMap<ConnectionId, mpsc::Sender<String>>>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the receiving end of its queue.
    pub fn register(&self, connection: ConnectionId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection, tx);
        rx
    }

    /// Forgets a connection; frames addressed to it are dropped afterwards.
    pub fn unregister(&self, connection: ConnectionId) {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&connection);
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queues a frame for one connection.
    ///
    /// A connection that cannot take the frame is unregistered, so it never
    /// sees a stream with gaps.
    pub fn send(&self, connection: ConnectionId, message: &ServerMessage) {
        let result = {
            let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
            let Some(sender) = senders.get(&connection) else {
                debug!(%connection, kind = %message.kind, "frame for unknown connection dropped");
                return;
            };
            sender.try_send(message.to_json())
        };
        match result {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%connection, kind = %message.kind, "outbound queue full; closing connection");
                self.unregister(connection);
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%connection, kind = %message.kind, "outbound queue closed");
                self.unregister(connection);
            }
        }
    }
}

impl Notifier for ConnectionHub {
    fn notify(&self, recipient: ConnectionId, event: &dyn DomainEvent) {
        self.send(recipient, &ServerMessage::from_event(event));
    }
}

#[cfg(test)]
mod tests {
    use awful_authors_core::error::DomainError;
    use awful_authors_core::ids::RoomId;

    use super::*;

    #[tokio::test]
    async fn test_send_reaches_registered_connection() {
        let hub = ConnectionHub::new();
        let conn = ConnectionId::new();
        let mut rx = hub.register(conn);

        hub.send(conn, &ServerMessage::error(&DomainError::RoomNotFound(RoomId::new())));

        let frame = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["data"]["code"], "room_not_found");
    }

    #[tokio::test]
    async fn test_unregistered_connection_is_ignored() {
        let hub = ConnectionHub::new();
        let conn = ConnectionId::new();
        let mut rx = hub.register(conn);
        hub.unregister(conn);

        hub.send(conn, &ServerMessage::server_identity(uuid::Uuid::new_v4()));

        assert_eq!(hub.connection_count(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_closes_connection() {
        let hub = ConnectionHub::new();
        let conn = ConnectionId::new();
        let other = ConnectionId::new();
        let mut rx = hub.register(conn);
        let _other_rx = hub.register(other);
        let frame = ServerMessage::server_identity(uuid::Uuid::new_v4());

        for _ in 0..CHANNEL_CAPACITY + 10 {
            hub.send(conn, &frame);
        }

        assert_eq!(hub.connection_count(), 1);
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, CHANNEL_CAPACITY);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_unregistered() {
        let hub = ConnectionHub::new();
        let conn = ConnectionId::new();
        drop(hub.register(conn));

        hub.send(conn, &ServerMessage::server_identity(uuid::Uuid::new_v4()));

        assert_eq!(hub.connection_count(), 0);
    }
}
