//! Integration tests for `PgStoryRepository`.
//!
//! These need a live PostgreSQL instance reachable through `DATABASE_URL`;
//! run them with `cargo test -- --ignored`.

use awful_authors_core::ids::RoomId;
use awful_authors_core::repository::{StoryRecord, StoryRepository};
use awful_authors_story_store::pg_story_repository::PgStoryRepository;
use sqlx::PgPool;

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_load_returns_none_for_unknown_room(pool: PgPool) {
    let repo = PgStoryRepository::new(pool);

    let record = repo.load(RoomId::new()).await.unwrap();

    assert!(record.is_none());
}

// --- save + append round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_extends_saved_record(pool: PgPool) {
    let repo = PgStoryRepository::new(pool);
    let room_id = RoomId::new();
    repo.save(&StoryRecord::empty(room_id)).await.unwrap();

    repo.append(room_id, "cat sat. ", "00").await.unwrap();
    repo.append(room_id, "dog ran. ", "11").await.unwrap();

    let record = repo.load(room_id).await.unwrap().unwrap();
    assert_eq!(record.story, "cat sat. dog ran. ");
    assert_eq!(record.contribution, "0011");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_without_saved_record_creates_one(pool: PgPool) {
    let repo = PgStoryRepository::new(pool);
    let room_id = RoomId::new();

    repo.append(room_id, "hi ", "0").await.unwrap();

    let record = repo.load(room_id).await.unwrap().unwrap();
    assert_eq!(record.story, "hi ");
    assert_eq!(record.contribution, "0");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_save_overwrites_previous_story(pool: PgPool) {
    let repo = PgStoryRepository::new(pool);
    let room_id = RoomId::new();
    repo.append(room_id, "a finished game ", "000").await.unwrap();

    repo.save(&StoryRecord::empty(room_id)).await.unwrap();

    let record = repo.load(room_id).await.unwrap().unwrap();
    assert_eq!(record, StoryRecord::empty(room_id));
}

// --- delete ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_removes_record(pool: PgPool) {
    let repo = PgStoryRepository::new(pool);
    let room_id = RoomId::new();
    repo.append(room_id, "hi ", "0").await.unwrap();

    repo.delete(room_id).await.unwrap();

    assert!(repo.load(room_id).await.unwrap().is_none());
}
