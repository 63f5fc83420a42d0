//! HTTP and WebSocket routes.

pub mod health;
pub mod rooms;
pub mod ws;
