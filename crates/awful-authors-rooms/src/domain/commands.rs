//! Commands for the story room context.

use awful_authors_core::command::Command;
use awful_authors_core::ids::{ConnectionId, PlayerId, RoomId};
use uuid::Uuid;

use super::keys::Keystroke;

/// Command to open a new room with the sender as its first player.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The host's validated nickname.
    pub nickname: String,
}

impl Command for CreateRoom {
    fn command_type(&self) -> &'static str {
        "room.create_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Command to join a room, or to recover a seat after reconnecting.
#[derive(Debug, Clone)]
pub struct JoinRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The room to join.
    pub room_id: RoomId,
    /// The validated nickname.
    pub nickname: String,
    /// A seat identifier the client held before, if any.
    pub player_id: Option<PlayerId>,
}

impl Command for JoinRoom {
    fn command_type(&self) -> &'static str {
        "room.join_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn room_id(&self) -> Option<RoomId> {
        Some(self.room_id)
    }
}

/// Command to relay a lobby setting edit.
#[derive(Debug, Clone)]
pub struct ChangeLobbySetting {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The room whose lobby is being edited.
    pub room_id: RoomId,
    /// Setting name.
    pub key: String,
    /// Setting value.
    pub value: serde_json::Value,
}

impl Command for ChangeLobbySetting {
    fn command_type(&self) -> &'static str {
        "room.change_lobby_setting"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn room_id(&self) -> Option<RoomId> {
        Some(self.room_id)
    }
}

/// Command to fix the game parameters.
#[derive(Debug, Clone)]
pub struct ConfigureGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The room to configure.
    pub room_id: RoomId,
    /// Words per turn, `1..=10`.
    pub word_count: u32,
    /// Rounds to play, `1..=100`.
    pub round_count: u32,
    /// Prompt index; `None` picks one at random.
    pub prompt_index: Option<i64>,
}

impl Command for ConfigureGame {
    fn command_type(&self) -> &'static str {
        "room.configure_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn room_id(&self) -> Option<RoomId> {
        Some(self.room_id)
    }
}

/// Command to begin play.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The room to start.
    pub room_id: RoomId,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "room.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn room_id(&self) -> Option<RoomId> {
        Some(self.room_id)
    }
}

/// Command carrying one keystroke from a writer.
#[derive(Debug, Clone)]
pub struct PressKey {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The room being written in.
    pub room_id: RoomId,
    /// The validated key.
    pub key: Keystroke,
}

impl Command for PressKey {
    fn command_type(&self) -> &'static str {
        "room.press_key"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn room_id(&self) -> Option<RoomId> {
        Some(self.room_id)
    }
}

/// Command to reset a room for another game.
#[derive(Debug, Clone)]
pub struct PlayAgain {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection the command arrived on.
    pub connection_id: ConnectionId,
    /// The room to reset.
    pub room_id: RoomId,
    /// Seat identifier the presser keeps in the new game.
    pub player_id: PlayerId,
    /// The presser's validated nickname.
    pub nickname: String,
}

impl Command for PlayAgain {
    fn command_type(&self) -> &'static str {
        "room.play_again"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn room_id(&self) -> Option<RoomId> {
        Some(self.room_id)
    }
}

/// Command raised by the transport when a connection closes.
#[derive(Debug, Clone)]
pub struct Disconnect {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection that closed.
    pub connection_id: ConnectionId,
}

impl Command for Disconnect {
    fn command_type(&self) -> &'static str {
        "room.disconnect"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}
