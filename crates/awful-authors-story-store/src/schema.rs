//! Story store database schema.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};

/// Name of the table holding one transcript row per room.
pub const STORY_RECORDS_TABLE: &str = "story_records";

/// Embedded migrations from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies any pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}
