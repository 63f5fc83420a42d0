//! WebSocket wire protocol.
//!
//! Clients send `{"type": "<snake_case command>", ...fields}` text frames.
//! The server answers with `{"type": "<event type>", "sequence": n, "data": {...}}`
//! where `sequence` is the room's event position; connection-level frames
//! (`server_identity`, `error`) omit it.

use awful_authors_core::error::DomainError;
use awful_authors_core::event::DomainEvent;
use awful_authors_core::ids::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::error_code;

/// Client-to-server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room.
    CreateRoom {
        /// The host's nickname.
        nickname: String,
    },
    /// Join a room, optionally reclaiming an earlier seat.
    JoinRoom {
        /// The joiner's nickname.
        nickname: String,
        /// The room code.
        room_id: RoomId,
        /// A seat identifier from an earlier connection.
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    /// Relay a lobby setting edit.
    ChangeLobbySetting {
        /// The room code.
        room_id: RoomId,
        /// Setting name.
        key: String,
        /// Setting value.
        value: serde_json::Value,
    },
    /// Fix the game parameters.
    ConfigureGame {
        /// The room code.
        room_id: RoomId,
        /// Words per turn.
        word_count: i64,
        /// Rounds to play.
        round_count: i64,
        /// Prompt index; omitted for a random prompt.
        #[serde(default)]
        prompt_index: Option<i64>,
    },
    /// Begin play.
    StartGame {
        /// The room code.
        room_id: RoomId,
    },
    /// One keystroke from the active writer.
    KeyPress {
        /// The room code.
        room_id: RoomId,
        /// A single character.
        key: String,
    },
    /// Reset a finished room for another game.
    PlayAgain {
        /// The room code.
        room_id: RoomId,
        /// The presser's seat identifier.
        player_id: PlayerId,
        /// The presser's nickname.
        nickname: String,
    },
}

impl ClientMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for malformed JSON, unknown
    /// message types, missing fields or ill-formed identifiers.
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        serde_json::from_str(text)
            .map_err(|e| DomainError::InvalidInput(format!("malformed message: {e}")))
    }
}

/// Server-to-client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Event type, e.g. `room.turn_started`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Per-room event sequence number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    /// Event payload.
    pub data: serde_json::Value,
}

/// Frame type carrying the server's identity.
pub const SERVER_IDENTITY_TYPE: &str = "server_identity";

/// Frame type carrying an error.
pub const ERROR_TYPE: &str = "error";

impl ServerMessage {
    /// Announces the server instance, so clients can tell a restart from a
    /// dropped connection.
    #[must_use]
    pub fn server_identity(server_id: Uuid) -> Self {
        Self {
            kind: SERVER_IDENTITY_TYPE.to_owned(),
            sequence: None,
            data: serde_json::json!({ "server_id": server_id }),
        }
    }

    /// Reports a failed command to the connection that sent it.
    #[must_use]
    pub fn error(err: &DomainError) -> Self {
        Self {
            kind: ERROR_TYPE.to_owned(),
            sequence: None,
            data: serde_json::json!({
                "code": error_code(err),
                "message": err.to_string(),
            }),
        }
    }

    /// Wraps a room event.
    #[must_use]
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        Self {
            kind: event.event_type().to_owned(),
            sequence: Some(event.metadata().sequence_number),
            data: event.to_payload(),
        }
    }

    /// Serializes the frame.
    ///
    /// # Panics
    ///
    /// Never; every field serializes infallibly.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerMessage serialization is infallible")
    }
}
