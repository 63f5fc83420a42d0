//! Command abstractions.

use uuid::Uuid;

use crate::ids::{ConnectionId, RoomId};

/// Trait that all inbound room commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The connection the command arrived on.
    fn connection_id(&self) -> ConnectionId;

    /// The room the command is addressed to, if it targets an existing room.
    fn room_id(&self) -> Option<RoomId> {
        None
    }
}
