//! Aggregate root abstraction.

use crate::event::DomainEvent;
use crate::ids::RoomId;

/// Trait for aggregate roots that raise events while handling commands.
///
/// Events accumulate on the aggregate until the application layer drains
/// them and hands them to a [`Notifier`](crate::notifier::Notifier).
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> RoomId;

    /// Returns the current version (number of events raised so far).
    fn version(&self) -> i64;

    /// Returns events raised since the last drain.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Removes and returns the pending events, oldest first.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;
}
