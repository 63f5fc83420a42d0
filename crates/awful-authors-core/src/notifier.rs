//! Outbound notification contract.

use crate::event::DomainEvent;
use crate::ids::ConnectionId;

/// Delivers events to individual connections.
///
/// Implementations must not block: they are called while the addressed room
/// is locked, so delivery order per room equals the order events were raised.
pub trait Notifier: Send + Sync {
    /// Queues `event` for delivery to `recipient`. Unknown or closed
    /// recipients are ignored.
    fn notify(&self, recipient: ConnectionId, event: &dyn DomainEvent);
}
