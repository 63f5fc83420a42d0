//! In-memory implementation of the `StoryRepository` trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use awful_authors_core::error::DomainError;
use awful_authors_core::ids::RoomId;
use awful_authors_core::repository::{StoryRecord, StoryRepository};

/// Process-local story repository, used when no database is configured.
///
/// Records do not survive a restart, which matches the lifetime of the rooms
/// themselves.
#[derive(Debug, Default)]
pub struct InMemoryStoryRepository {
    records: Mutex<HashMap<RoomId, StoryRecord>>,
}

impl InMemoryStoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<RoomId, StoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn load(&self, room_id: RoomId) -> Result<Option<StoryRecord>, DomainError> {
        Ok(self.records().get(&room_id).cloned())
    }

    async fn save(&self, record: &StoryRecord) -> Result<(), DomainError> {
        self.records().insert(record.room_id, record.clone());
        Ok(())
    }

    async fn append(
        &self,
        room_id: RoomId,
        story: &str,
        contribution: &str,
    ) -> Result<(), DomainError> {
        let mut records = self.records();
        let record = records
            .entry(room_id)
            .or_insert_with(|| StoryRecord::empty(room_id));
        record.story.push_str(story);
        record.contribution.push_str(contribution);
        Ok(())
    }

    async fn delete(&self, room_id: RoomId) -> Result<(), DomainError> {
        self.records().remove(&room_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_creates_then_extends_record() {
        // Arrange
        let repo = InMemoryStoryRepository::new();
        let room_id = RoomId::new();

        // Act
        repo.append(room_id, "hi ", "0").await.unwrap();
        repo.append(room_id, "bye ", "1").await.unwrap();

        // Assert
        let record = repo.load(room_id).await.unwrap().unwrap();
        assert_eq!(record.story, "hi bye ");
        assert_eq!(record.contribution, "01");
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_record() {
        let repo = InMemoryStoryRepository::new();
        let room_id = RoomId::new();
        repo.append(room_id, "old text", "00").await.unwrap();

        repo.save(&StoryRecord::empty(room_id)).await.unwrap();

        let record = repo.load(room_id).await.unwrap().unwrap();
        assert_eq!(record, StoryRecord::empty(room_id));
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_tolerates_missing() {
        let repo = InMemoryStoryRepository::new();
        let room_id = RoomId::new();
        repo.save(&StoryRecord::empty(room_id)).await.unwrap();

        repo.delete(room_id).await.unwrap();
        repo.delete(room_id).await.unwrap();

        assert!(repo.load(room_id).await.unwrap().is_none());
    }
}
