//! Query handlers for the story room context.
//!
//! Read-only snapshots of live rooms, used by the HTTP surface and tests.

use awful_authors_core::error::DomainError;
use awful_authors_core::ids::{PlayerId, RoomId};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::registry::RoomRegistry;

/// Read-only view of a live room.
#[derive(Debug, Serialize)]
pub struct RoomView {
    /// The room identifier.
    pub room_id: RoomId,
    /// Lifecycle phase as a string.
    pub phase: String,
    /// Nicknames in turn order.
    pub roster: Vec<String>,
    /// Seat identifiers in turn order.
    pub player_ids: Vec<PlayerId>,
    /// Current per-turn quota.
    pub word_limit: Option<u32>,
    /// Rounds to play.
    pub round_limit: Option<u32>,
    /// The configured prompt.
    pub prompt: String,
    /// Completed rounds.
    pub current_round: u32,
    /// The writer holding the running turn.
    pub active_player_id: Option<PlayerId>,
    /// Text typed in the current turn.
    pub current_round_story: String,
    /// Whether the quota includes a grace word.
    pub pending_quota_adjustment: bool,
    /// Deadline of the running turn.
    pub deadline: Option<DateTime<Utc>>,
    /// Number of live connections.
    pub connections: usize,
}

impl RoomRegistry {
    /// Retrieves a snapshot of a live room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room does not exist.
    pub async fn get_room(&self, room_id: RoomId) -> Result<RoomView, DomainError> {
        let entry = self.lock_room(room_id).await?;
        let session = &entry.session;
        Ok(RoomView {
            room_id: session.id,
            phase: session.phase().to_string(),
            roster: session.roster(),
            player_ids: session.player_ids(),
            word_limit: session.word_limit(),
            round_limit: session.round_limit(),
            prompt: session.prompt().to_owned(),
            current_round: session.current_round(),
            active_player_id: session.active_player_id(),
            current_round_story: session.current_round_story().to_owned(),
            pending_quota_adjustment: session.pending_quota_adjustment(),
            deadline: session.deadline(),
            connections: session.connection_ids().len(),
        })
    }
}
