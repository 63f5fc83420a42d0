//! WebSocket endpoint.
//!
//! One task per socket reads client frames and dispatches them to the room
//! registry; a companion task drains the connection's hub queue into the
//! socket. The socket closes as soon as either side finishes.

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use awful_authors_core::error::DomainError;
use awful_authors_core::ids::ConnectionId;
use awful_authors_rooms::domain::commands::Disconnect;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::validation::Inbound;

/// Largest accepted client frame in bytes.
pub const MAX_FRAME_SIZE: usize = 16 * 1024;

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_failed_upgrade(|error| {
            warn!(%error, "websocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::new();
    info!(%connection, "connection opened");

    let mut outbound = state.hub.register(connection);
    state
        .hub
        .send(connection, &ServerMessage::server_identity(state.server_id));

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        debug!(%connection, "send task finished");
    });

    loop {
        tokio::select! {
            message = ws_receiver.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch(&state, connection, text.as_str()).await,
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut send_task => {
                debug!(%connection, "outbound side closed");
                break;
            }
        }
    }

    state
        .registry
        .handle_disconnect(&Disconnect {
            correlation_id: Uuid::new_v4(),
            connection_id: connection,
        })
        .await;
    state.hub.unregister(connection);
    send_task.abort();
    info!(%connection, "connection closed");
}

/// Handles one client text frame; failures are reported to the sender only.
#[instrument(skip(state, text))]
pub async fn dispatch(state: &AppState, connection: ConnectionId, text: &str) {
    if let Err(err) = run(state, connection, text).await {
        debug!(error = %err, "command rejected");
        state.hub.send(connection, &ServerMessage::error(&err));
    }
}

async fn run(state: &AppState, connection: ConnectionId, text: &str) -> Result<(), DomainError> {
    let message = ClientMessage::parse(text)?;
    let inbound = Inbound::from_client(message, connection, Uuid::new_v4())?;
    debug!(command = inbound.command_type(), "dispatching");

    let registry = &state.registry;
    match inbound {
        Inbound::CreateRoom(command) => {
            registry.handle_create_room(&command);
        }
        Inbound::JoinRoom(command) => {
            registry.handle_join_room(&command).await?;
        }
        Inbound::ChangeLobbySetting(command) => {
            registry.handle_change_lobby_setting(&command).await?;
        }
        Inbound::ConfigureGame(command) => registry.handle_configure_game(&command).await?,
        Inbound::StartGame(command) => registry.handle_start_game(&command).await?,
        Inbound::PressKey(command) => registry.handle_press_key(&command).await?,
        Inbound::PlayAgain(command) => registry.handle_play_again(&command).await?,
    }
    Ok(())
}

/// Returns the WebSocket router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
