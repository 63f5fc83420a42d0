//! Domain events for the story room context.

use awful_authors_core::event::{DomainEvent, EventMetadata};
use awful_authors_core::ids::{ConnectionId, PlayerId, RoomId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emitted to a connection that has taken a seat in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedRoom {
    /// The seat assigned to (or recovered by) the connection.
    pub player_id: PlayerId,
    /// The room joined.
    pub room_id: RoomId,
    /// Nicknames in join order.
    pub roster: Vec<String>,
    /// Number of prompts the host can choose from.
    pub prompt_count: usize,
}

/// Emitted to a reconnecting connection before its room state is replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResumed {
    /// Nickname of the recovered seat.
    pub nickname: String,
}

/// Emitted when the lobby roster changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyRosterChanged {
    /// Nicknames in join order.
    pub roster: Vec<String>,
}

/// Relays a lobby setting edit to the other members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySettingChanged {
    /// Setting name, opaque to the server.
    pub key: String,
    /// Setting value, opaque to the server.
    pub value: serde_json::Value,
}

/// Emitted when the host fixes the game parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfigured {
    /// Words each writer must complete per turn.
    pub word_count: u32,
    /// Rounds to play.
    pub round_count: u32,
    /// The story prompt, possibly empty.
    pub prompt: String,
    /// Nicknames in turn order.
    pub roster: Vec<String>,
    /// Seat identifiers in turn order.
    pub player_ids: Vec<PlayerId>,
    /// Set when replayed to a reconnecting connection.
    pub is_rejoin: bool,
}

/// Emitted when play begins, or replayed on reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStarted {
    /// The writer holding the first (or current) turn.
    pub first_player_id: PlayerId,
}

/// Emitted when a writer's turn begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStarted {
    /// The active writer.
    pub player_id: PlayerId,
    /// Words the writer must complete.
    pub quota: u32,
    /// When the turn ends if the quota is not met first.
    pub deadline: DateTime<Utc>,
}

/// Relays an accepted keystroke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyApplied {
    /// The character to render; a forced line arrives as a word boundary.
    pub key: char,
}

/// Emitted when the last writer in turn order finishes and play continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEnded {
    /// One-based number of the round about to start.
    pub next_round: u32,
}

/// Sent to a reconnecting connection while a game is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryState {
    /// One-based number of the current round.
    pub round: u32,
    /// Persisted story followed by the current round's text.
    pub story: String,
}

/// Emitted once the final round has been written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEnded {
    /// The complete story.
    pub story: String,
    /// The prompt the story was written to.
    pub prompt: String,
    /// Nicknames in turn order; tag `n` refers to `roster[n]`.
    pub roster: Vec<String>,
    /// One author tag per word of `story`.
    pub contribution: String,
}

/// Emitted when a member starts a new game in the same room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameReset {
    /// The room being reset.
    pub room_id: RoomId,
}

/// Invites the other members back into a reset room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecreated {
    /// The room to rejoin.
    pub room_id: RoomId,
}

/// Emitted when the story could not be written durably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceWarning {
    /// Description of the failure.
    pub message: String,
}

/// Event type identifier for [`JoinedRoom`].
pub const JOINED_ROOM_EVENT_TYPE: &str = "room.joined";

/// Event type identifier for [`SessionResumed`].
pub const SESSION_RESUMED_EVENT_TYPE: &str = "room.session_resumed";

/// Event type identifier for [`LobbyRosterChanged`].
pub const LOBBY_ROSTER_CHANGED_EVENT_TYPE: &str = "room.lobby_roster_changed";

/// Event type identifier for [`LobbySettingChanged`].
pub const LOBBY_SETTING_CHANGED_EVENT_TYPE: &str = "room.lobby_setting_changed";

/// Event type identifier for [`GameConfigured`].
pub const GAME_CONFIGURED_EVENT_TYPE: &str = "room.game_configured";

/// Event type identifier for [`GameStarted`].
pub const GAME_STARTED_EVENT_TYPE: &str = "room.game_started";

/// Event type identifier for [`TurnStarted`].
pub const TURN_STARTED_EVENT_TYPE: &str = "room.turn_started";

/// Event type identifier for [`KeyApplied`].
pub const KEY_APPLIED_EVENT_TYPE: &str = "room.key_applied";

/// Event type identifier for [`RoundEnded`].
pub const ROUND_ENDED_EVENT_TYPE: &str = "room.round_ended";

/// Event type identifier for [`RecoveryState`].
pub const RECOVERY_STATE_EVENT_TYPE: &str = "room.recovery_state";

/// Event type identifier for [`GameEnded`].
pub const GAME_ENDED_EVENT_TYPE: &str = "room.game_ended";

/// Event type identifier for [`GameReset`].
pub const GAME_RESET_EVENT_TYPE: &str = "room.game_reset";

/// Event type identifier for [`RoomRecreated`].
pub const ROOM_RECREATED_EVENT_TYPE: &str = "room.room_recreated";

/// Event type identifier for [`PersistenceWarning`].
pub const PERSISTENCE_WARNING_EVENT_TYPE: &str = "room.persistence_warning";

/// Event payload variants for the story room context.
///
/// Serializes as the bare payload; the event type travels separately.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RoomEventKind {
    /// A connection took a seat.
    JoinedRoom(JoinedRoom),
    /// A connection recovered an existing seat.
    SessionResumed(SessionResumed),
    /// The lobby roster changed.
    LobbyRosterChanged(LobbyRosterChanged),
    /// A lobby setting was edited.
    LobbySettingChanged(LobbySettingChanged),
    /// The game parameters were fixed.
    GameConfigured(GameConfigured),
    /// Play began.
    GameStarted(GameStarted),
    /// A turn began.
    TurnStarted(TurnStarted),
    /// A keystroke was accepted.
    KeyApplied(KeyApplied),
    /// A round finished.
    RoundEnded(RoundEnded),
    /// Recovery snapshot for a reconnecting connection.
    RecoveryState(RecoveryState),
    /// The game finished.
    GameEnded(GameEnded),
    /// The room was reset for another game.
    GameReset(GameReset),
    /// Other members are invited back into the reset room.
    RoomRecreated(RoomRecreated),
    /// A durable write failed.
    PersistenceWarning(PersistenceWarning),
}

impl RoomEventKind {
    /// The event type identifier for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JoinedRoom(_) => JOINED_ROOM_EVENT_TYPE,
            Self::SessionResumed(_) => SESSION_RESUMED_EVENT_TYPE,
            Self::LobbyRosterChanged(_) => LOBBY_ROSTER_CHANGED_EVENT_TYPE,
            Self::LobbySettingChanged(_) => LOBBY_SETTING_CHANGED_EVENT_TYPE,
            Self::GameConfigured(_) => GAME_CONFIGURED_EVENT_TYPE,
            Self::GameStarted(_) => GAME_STARTED_EVENT_TYPE,
            Self::TurnStarted(_) => TURN_STARTED_EVENT_TYPE,
            Self::KeyApplied(_) => KEY_APPLIED_EVENT_TYPE,
            Self::RoundEnded(_) => ROUND_ENDED_EVENT_TYPE,
            Self::RecoveryState(_) => RECOVERY_STATE_EVENT_TYPE,
            Self::GameEnded(_) => GAME_ENDED_EVENT_TYPE,
            Self::GameReset(_) => GAME_RESET_EVENT_TYPE,
            Self::RoomRecreated(_) => ROOM_RECREATED_EVENT_TYPE,
            Self::PersistenceWarning(_) => PERSISTENCE_WARNING_EVENT_TYPE,
        }
    }
}

/// Who receives an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connection in the room.
    Room,
    /// Every connection in the room except one.
    RoomExcept(ConnectionId),
    /// A single connection.
    Connection(ConnectionId),
}

/// Domain event envelope for the story room context.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Recipients of the event.
    pub audience: Audience,
    /// Event-specific payload.
    pub kind: RoomEventKind,
}

impl DomainEvent for RoomEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("RoomEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
