//! Test notifier: captures every delivery for later assertions.

use std::sync::Mutex;

use awful_authors_core::event::DomainEvent;
use awful_authors_core::ids::ConnectionId;
use awful_authors_core::notifier::Notifier;

/// One event as seen by one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The connection the event was addressed to.
    pub recipient: ConnectionId,
    /// The event type name.
    pub event_type: String,
    /// The serialized event payload.
    pub payload: serde_json::Value,
}

/// A notifier that records deliveries in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    /// Create an empty recording notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every delivery so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Deliveries addressed to `recipient`, in order.
    pub fn delivered_to(&self, recipient: ConnectionId) -> Vec<Delivery> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.recipient == recipient)
            .collect()
    }

    /// Event types addressed to `recipient`, in order.
    pub fn event_types_for(&self, recipient: ConnectionId) -> Vec<String> {
        self.delivered_to(recipient)
            .into_iter()
            .map(|d| d.event_type)
            .collect()
    }

    /// The last payload of `event_type` addressed to `recipient`.
    pub fn last_payload(
        &self,
        recipient: ConnectionId,
        event_type: &str,
    ) -> Option<serde_json::Value> {
        self.delivered_to(recipient)
            .into_iter()
            .rev()
            .find(|d| d.event_type == event_type)
            .map(|d| d.payload)
    }

    /// Forget everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.deliveries.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipient: ConnectionId, event: &dyn DomainEvent) {
        self.deliveries.lock().unwrap().push(Delivery {
            recipient,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
        });
    }
}
