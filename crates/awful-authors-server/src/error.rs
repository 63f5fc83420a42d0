//! Awful Authors: server error types.

use awful_authors_core::error::DomainError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Tracing or span export could not be set up.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Stable machine-readable code for a domain error.
#[must_use]
pub fn error_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::RoomNotFound(_) => "room_not_found",
        DomainError::RoomFull(_) => "room_full",
        DomainError::GameAlreadyStarted(_) => "game_already_started",
        DomainError::InvalidPhase(_) => "invalid_phase",
        DomainError::InvalidInput(_) => "invalid_input",
        DomainError::PersistenceFailure(_) => "persistence_failure",
    }
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::RoomFull(_)
            | DomainError::GameAlreadyStarted(_)
            | DomainError::InvalidPhase(_) => StatusCode::CONFLICT,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: error_code(&self.0),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
