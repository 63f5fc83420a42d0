//! Read-only room endpoints.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use awful_authors_core::ids::RoomId;
use awful_authors_rooms::application::query_handlers::RoomView;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v1/rooms/{room_id}
async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomView>, ApiError> {
    let view = state.registry.get_room(room_id).await?;
    Ok(Json(view))
}

/// Returns the rooms router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{room_id}", get(get_room))
}
