//! Awful Authors: WebSocket game server.
//!
//! Wires the room registry to clients: each WebSocket connection is
//! registered with the [`hub::ConnectionHub`], its frames are validated into
//! room commands, and room events flow back through the hub.

pub mod config;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod validation;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full application router.
pub fn app(state: state::AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .merge(routes::ws::router())
        .nest("/api/v1/rooms", routes::rooms::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
