//! Domain error types.

use thiserror::Error;

use crate::ids::RoomId;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An event was addressed to a room that does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// The room already holds the maximum number of players.
    #[error("room {0} has reached max players")]
    RoomFull(RoomId),

    /// A new player tried to join a room whose game was already configured.
    #[error("the game in room {0} has already started")]
    GameAlreadyStarted(RoomId),

    /// A command arrived in a phase that does not accept it.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    /// A malformed event payload, rejected at the boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A durable read or write failed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}
