//! Awful Authors story store.
//!
//! Implementations of [`StoryRepository`](awful_authors_core::repository::StoryRepository):
//! a PostgreSQL-backed store for deployments and an in-memory store for local
//! runs without a database.

pub mod memory_story_repository;
pub mod pg_story_repository;
pub mod schema;
