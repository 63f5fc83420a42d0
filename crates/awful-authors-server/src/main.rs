//! Awful Authors server entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use awful_authors_core::clock::SystemClock;
use awful_authors_core::repository::StoryRepository;
use awful_authors_core::rng::ThreadRng;
use awful_authors_rooms::application::registry::RoomRegistry;
use awful_authors_server::config::Config;
use awful_authors_server::hub::ConnectionHub;
use awful_authors_server::state::AppState;
use awful_authors_server::{app, telemetry};
use awful_authors_story_store::memory_story_repository::InMemoryStoryRepository;
use awful_authors_story_store::pg_story_repository::PgStoryRepository;
use awful_authors_story_store::schema::run_migrations;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Awful Authors server");

    let repository: Arc<dyn StoryRepository> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            run_migrations(&pool).await?;
            tracing::info!("Story records stored in PostgreSQL");
            Arc::new(PgStoryRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; story records kept in memory");
            Arc::new(InMemoryStoryRepository::new())
        }
    };

    let hub = Arc::new(ConnectionHub::new());
    let registry = RoomRegistry::new(
        config.rules()?,
        Arc::new(SystemClock),
        Arc::new(Mutex::new(ThreadRng)),
        repository,
        hub.clone(),
    );
    let app_state = AppState::new(registry, hub);

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
