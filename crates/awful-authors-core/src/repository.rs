//! Story repository abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::RoomId;

/// Persisted transcript of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    /// Room this record belongs to.
    pub room_id: RoomId,
    /// Full story text, append-only across turns.
    pub story: String,
    /// One player tag per completed word, aligned with `story` word-for-word.
    pub contribution: String,
}

impl StoryRecord {
    /// An empty record for `room_id`.
    #[must_use]
    pub fn empty(room_id: RoomId) -> Self {
        Self {
            room_id,
            story: String::new(),
            contribution: String::new(),
        }
    }
}

/// Repository trait for reading and writing room transcripts.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Load the record for a room, if one exists.
    async fn load(&self, room_id: RoomId) -> Result<Option<StoryRecord>, DomainError>;

    /// Overwrite (or create) the record for `record.room_id`.
    async fn save(&self, record: &StoryRecord) -> Result<(), DomainError>;

    /// Append a turn's text and contribution tags to a room's record,
    /// creating the record if it does not exist yet.
    async fn append(
        &self,
        room_id: RoomId,
        story: &str,
        contribution: &str,
    ) -> Result<(), DomainError>;

    /// Delete the record for a room. Deleting a missing record succeeds.
    async fn delete(&self, room_id: RoomId) -> Result<(), DomainError>;
}
