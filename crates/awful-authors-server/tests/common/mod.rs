//! Shared test helpers for server integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use awful_authors_core::clock::Clock;
use awful_authors_core::ids::ConnectionId;
use awful_authors_core::repository::StoryRepository;
use awful_authors_rooms::application::registry::RoomRegistry;
use awful_authors_rooms::domain::settings::GameRules;
use awful_authors_server::hub::ConnectionHub;
use awful_authors_server::routes::ws::dispatch;
use awful_authors_server::state::AppState;
use awful_authors_story_store::memory_story_repository::InMemoryStoryRepository;
use awful_authors_test_support::{FixedClock, MockRng, fixed_now};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Build application state around `repository`, with a frozen clock and an
/// RNG that always picks the first prompt.
pub fn build_state(repository: Arc<dyn StoryRepository>) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_now()));
    let hub = Arc::new(ConnectionHub::new());
    let registry = RoomRegistry::new(
        GameRules::default(),
        clock,
        Arc::new(Mutex::new(MockRng)),
        repository,
        hub.clone(),
    );
    AppState::new(registry, hub)
}

/// Build state backed by the in-memory story repository.
pub fn build_memory_state() -> AppState {
    build_state(Arc::new(InMemoryStoryRepository::new()))
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(state: AppState) -> Router {
    awful_authors_server::app(state)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// A connection driven without a socket: frames go through the same
/// dispatcher the WebSocket route uses, and replies are read from the hub.
pub struct TestClient {
    pub connection: ConnectionId,
    outbound: mpsc::Receiver<String>,
    state: AppState,
}

impl TestClient {
    /// Register a new connection with the hub.
    pub fn connect(state: &AppState) -> Self {
        let connection = ConnectionId::new();
        let outbound = state.hub.register(connection);
        Self {
            connection,
            outbound,
            state: state.clone(),
        }
    }

    /// Send one client frame.
    pub async fn send(&self, frame: serde_json::Value) {
        dispatch(&self.state, self.connection, &frame.to_string()).await;
    }

    /// Send a raw text frame.
    pub async fn send_text(&self, text: &str) {
        dispatch(&self.state, self.connection, text).await;
    }

    /// Press each character of `text` as a separate key.
    pub async fn type_text(&self, room_id: &str, text: &str) {
        for key in text.chars() {
            self.send(serde_json::json!({
                "type": "key_press",
                "room_id": room_id,
                "key": key.to_string(),
            }))
            .await;
        }
    }

    /// Drain every frame queued so far.
    pub fn frames(&mut self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }

    /// Drain queued frames and return the last one of type `kind`.
    pub fn last(&mut self, kind: &str) -> Option<serde_json::Value> {
        self.frames().into_iter().rev().find(|f| f["type"] == kind)
    }
}

/// Create a room as `nickname` and return the client and room code.
pub async fn create_room(state: &AppState, nickname: &str) -> (TestClient, String) {
    let (client, room_id, _) = create_room_as(state, nickname).await;
    (client, room_id)
}

/// Create a room as `nickname` and return the client, room code and seat.
pub async fn create_room_as(state: &AppState, nickname: &str) -> (TestClient, String, String) {
    let mut client = TestClient::connect(state);
    client
        .send(serde_json::json!({ "type": "create_room", "nickname": nickname }))
        .await;
    let joined = client.last("room.joined").unwrap();
    let room_id = joined["data"]["room_id"].as_str().unwrap().to_owned();
    let player_id = joined["data"]["player_id"].as_str().unwrap().to_owned();
    (client, room_id, player_id)
}

/// Configure and start a game in a room whose host is `host`.
pub async fn start_game(host: &TestClient, room_id: &str, words: u32, rounds: u32) {
    host.send(serde_json::json!({
        "type": "configure_game",
        "room_id": room_id,
        "word_count": words,
        "round_count": rounds,
        "prompt_index": 0,
    }))
    .await;
    host.send(serde_json::json!({ "type": "start_game", "room_id": room_id }))
        .await;
}

/// Join `room_id` as `nickname`.
pub async fn join_room(state: &AppState, room_id: &str, nickname: &str) -> TestClient {
    let client = TestClient::connect(state);
    client
        .send(serde_json::json!({
            "type": "join_room",
            "nickname": nickname,
            "room_id": room_id,
        }))
        .await;
    client
}
