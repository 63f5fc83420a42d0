//! `PostgreSQL` implementation of the `StoryRepository` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use awful_authors_core::error::DomainError;
use awful_authors_core::ids::RoomId;
use awful_authors_core::repository::{StoryRecord, StoryRepository};

/// PostgreSQL-backed story repository.
#[derive(Debug, Clone)]
pub struct PgStoryRepository {
    pool: PgPool,
}

impl PgStoryRepository {
    /// Creates a new `PgStoryRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn persistence(err: sqlx::Error) -> DomainError {
    DomainError::PersistenceFailure(err.to_string())
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    #[instrument(skip(self), err)]
    async fn load(&self, room_id: RoomId) -> Result<Option<StoryRecord>, DomainError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT story, contribution FROM story_records WHERE room_id = $1")
                .bind(room_id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;

        Ok(row.map(|(story, contribution)| StoryRecord {
            room_id,
            story,
            contribution,
        }))
    }

    #[instrument(skip(self, record), fields(room_id = %record.room_id), err)]
    async fn save(&self, record: &StoryRecord) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO story_records (room_id, story, contribution)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id) DO UPDATE
            SET story = EXCLUDED.story,
                contribution = EXCLUDED.contribution,
                updated_at = NOW()
            ",
        )
        .bind(record.room_id.0)
        .bind(&record.story)
        .bind(&record.contribution)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    #[instrument(skip(self, story, contribution), err)]
    async fn append(
        &self,
        room_id: RoomId,
        story: &str,
        contribution: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO story_records (room_id, story, contribution)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id) DO UPDATE
            SET story = story_records.story || EXCLUDED.story,
                contribution = story_records.contribution || EXCLUDED.contribution,
                updated_at = NOW()
            ",
        )
        .bind(room_id.0)
        .bind(story)
        .bind(contribution)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, room_id: RoomId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM story_records WHERE room_id = $1")
            .bind(room_id.0)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }
}
