//! Boundary validation: turns client frames into room commands.

use std::ops::RangeInclusive;

use awful_authors_core::error::DomainError;
use awful_authors_core::ids::ConnectionId;
use awful_authors_rooms::domain::commands::{
    ChangeLobbySetting, ConfigureGame, CreateRoom, JoinRoom, PlayAgain, PressKey, StartGame,
};
use awful_authors_rooms::domain::keys::Keystroke;
use awful_authors_rooms::domain::settings::validate_game_settings;
use uuid::Uuid;

use crate::protocol::ClientMessage;

/// Accepted nickname length in characters.
pub const NICKNAME_LENGTH: RangeInclusive<usize> = 2..=14;

/// Longest accepted lobby setting name.
pub const MAX_SETTING_KEY_LENGTH: usize = 64;

/// Checks a nickname: 2 to 14 ASCII letters, digits, underscores or spaces.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` otherwise.
pub fn validate_nickname(nickname: &str) -> Result<String, DomainError> {
    let allowed = nickname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ');
    if !allowed || !NICKNAME_LENGTH.contains(&nickname.chars().count()) {
        return Err(DomainError::InvalidInput(format!(
            "nickname must be 2-14 letters, digits, underscores or spaces, got {nickname:?}"
        )));
    }
    Ok(nickname.to_owned())
}

/// A validated command ready for the room registry.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Open a room.
    CreateRoom(CreateRoom),
    /// Join or rejoin a room.
    JoinRoom(JoinRoom),
    /// Relay a lobby edit.
    ChangeLobbySetting(ChangeLobbySetting),
    /// Fix the game parameters.
    ConfigureGame(ConfigureGame),
    /// Begin play.
    StartGame(StartGame),
    /// One keystroke.
    PressKey(PressKey),
    /// Reset the room.
    PlayAgain(PlayAgain),
}

impl Inbound {
    /// Validates a client frame received on `connection_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` if any field is out of bounds.
    pub fn from_client(
        message: ClientMessage,
        connection_id: ConnectionId,
        correlation_id: Uuid,
    ) -> Result<Self, DomainError> {
        Ok(match message {
            ClientMessage::CreateRoom { nickname } => Self::CreateRoom(CreateRoom {
                correlation_id,
                connection_id,
                nickname: validate_nickname(&nickname)?,
            }),
            ClientMessage::JoinRoom {
                nickname,
                room_id,
                player_id,
            } => Self::JoinRoom(JoinRoom {
                correlation_id,
                connection_id,
                room_id,
                nickname: validate_nickname(&nickname)?,
                player_id,
            }),
            ClientMessage::ChangeLobbySetting {
                room_id,
                key,
                value,
            } => {
                if key.is_empty() || key.len() > MAX_SETTING_KEY_LENGTH {
                    return Err(DomainError::InvalidInput(format!(
                        "setting name must be 1-{MAX_SETTING_KEY_LENGTH} bytes"
                    )));
                }
                Self::ChangeLobbySetting(ChangeLobbySetting {
                    correlation_id,
                    connection_id,
                    room_id,
                    key,
                    value,
                })
            }
            ClientMessage::ConfigureGame {
                room_id,
                word_count,
                round_count,
                prompt_index,
            } => {
                let (word_count, round_count) = validate_game_settings(word_count, round_count)?;
                Self::ConfigureGame(ConfigureGame {
                    correlation_id,
                    connection_id,
                    room_id,
                    word_count,
                    round_count,
                    prompt_index,
                })
            }
            ClientMessage::StartGame { room_id } => Self::StartGame(StartGame {
                correlation_id,
                connection_id,
                room_id,
            }),
            ClientMessage::KeyPress { room_id, key } => Self::PressKey(PressKey {
                correlation_id,
                connection_id,
                room_id,
                key: Keystroke::parse(&key)?,
            }),
            ClientMessage::PlayAgain {
                room_id,
                player_id,
                nickname,
            } => Self::PlayAgain(PlayAgain {
                correlation_id,
                connection_id,
                room_id,
                player_id,
                nickname: validate_nickname(&nickname)?,
            }),
        })
    }

    /// The command's type name, for logging.
    #[must_use]
    pub fn command_type(&self) -> &'static str {
        use awful_authors_core::command::Command;
        match self {
            Self::CreateRoom(c) => c.command_type(),
            Self::JoinRoom(c) => c.command_type(),
            Self::ChangeLobbySetting(c) => c.command_type(),
            Self::ConfigureGame(c) => c.command_type(),
            Self::StartGame(c) => c.command_type(),
            Self::PressKey(c) => c.command_type(),
            Self::PlayAgain(c) => c.command_type(),
        }
    }
}
