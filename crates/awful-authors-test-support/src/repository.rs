//! Test repositories: mock `StoryRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use awful_authors_core::error::DomainError;
use awful_authors_core::ids::RoomId;
use awful_authors_core::repository::{StoryRecord, StoryRepository};

/// A single call made against a [`RecordingStoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCall {
    /// `load(room_id)`
    Load(RoomId),
    /// `save(record)`
    Save(StoryRecord),
    /// `append(room_id, story, contribution)`
    Append(RoomId, String, String),
    /// `delete(room_id)`
    Delete(RoomId),
}

/// A working in-memory repository that also records every call made to it.
#[derive(Debug, Default)]
pub struct RecordingStoryRepository {
    records: Mutex<HashMap<RoomId, StoryRecord>>,
    calls: Mutex<Vec<RepositoryCall>>,
}

impl RecordingStoryRepository {
    /// Create an empty recording repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `append` calls recorded.
    pub fn append_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RepositoryCall::Append(..)))
            .count()
    }

    /// Returns the stored record for `room_id`, bypassing the call log.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn record(&self, room_id: RoomId) -> Option<StoryRecord> {
        self.records.lock().unwrap().get(&room_id).cloned()
    }

    fn log(&self, call: RepositoryCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StoryRepository for RecordingStoryRepository {
    async fn load(&self, room_id: RoomId) -> Result<Option<StoryRecord>, DomainError> {
        self.log(RepositoryCall::Load(room_id));
        Ok(self.record(room_id))
    }

    async fn save(&self, record: &StoryRecord) -> Result<(), DomainError> {
        self.log(RepositoryCall::Save(record.clone()));
        self.records
            .lock()
            .unwrap()
            .insert(record.room_id, record.clone());
        Ok(())
    }

    async fn append(
        &self,
        room_id: RoomId,
        story: &str,
        contribution: &str,
    ) -> Result<(), DomainError> {
        self.log(RepositoryCall::Append(
            room_id,
            story.to_owned(),
            contribution.to_owned(),
        ));
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(room_id)
            .or_insert_with(|| StoryRecord::empty(room_id));
        record.story.push_str(story);
        record.contribution.push_str(contribution);
        Ok(())
    }

    async fn delete(&self, room_id: RoomId) -> Result<(), DomainError> {
        self.log(RepositoryCall::Delete(room_id));
        self.records.lock().unwrap().remove(&room_id);
        Ok(())
    }
}

/// A repository whose every call fails with a persistence error. Useful for
/// testing that in-memory room state keeps advancing.
#[derive(Debug)]
pub struct FailingStoryRepository;

#[async_trait]
impl StoryRepository for FailingStoryRepository {
    async fn load(&self, _room_id: RoomId) -> Result<Option<StoryRecord>, DomainError> {
        Err(DomainError::PersistenceFailure("connection refused".into()))
    }

    async fn save(&self, _record: &StoryRecord) -> Result<(), DomainError> {
        Err(DomainError::PersistenceFailure("connection refused".into()))
    }

    async fn append(
        &self,
        _room_id: RoomId,
        _story: &str,
        _contribution: &str,
    ) -> Result<(), DomainError> {
        Err(DomainError::PersistenceFailure("connection refused".into()))
    }

    async fn delete(&self, _room_id: RoomId) -> Result<(), DomainError> {
        Err(DomainError::PersistenceFailure("connection refused".into()))
    }
}
