//! Shared application state.

use std::sync::Arc;

use awful_authors_rooms::application::registry::RoomRegistry;
use uuid::Uuid;

use crate::hub::ConnectionHub;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live rooms.
    pub registry: Arc<RoomRegistry>,
    /// Outbound queues of live connections.
    pub hub: Arc<ConnectionHub>,
    /// Identifies this server process to clients.
    pub server_id: Uuid,
}

impl AppState {
    /// Create new application state with a fresh server identity.
    #[must_use]
    pub fn new(registry: Arc<RoomRegistry>, hub: Arc<ConnectionHub>) -> Self {
        Self {
            registry,
            hub,
            server_id: Uuid::new_v4(),
        }
    }
}
