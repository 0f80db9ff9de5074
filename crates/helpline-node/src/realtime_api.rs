//! Real-time WebSocket API for live ticket updates.
//!
//! - `/ws` - WebSocket endpoint for room subscriptions and typing
//! - `/api/realtime/stats` - Statistics about live connections
//!
//! ## WebSocket Protocol
//!
//! Clients join the room of each ticket they are viewing and receive every
//! event published to it:
//!
//! ```json
//! // Join a ticket's room
//! {"type": "join", "ticket_id": "..."}
//!
//! // Leave it again
//! {"type": "leave", "ticket_id": "..."}
//!
//! // Announce typing to the rest of the room
//! {"type": "typing", "ticket_id": "..."}
//!
//! // Ping for keepalive
//! {"type": "ping"}
//! ```
//!
//! The upgrade request must carry the same identity headers as the HTTP
//! API; typing indicators are attributed to that identity.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use helpline_realtime::{ClientCommand, ServerMessage};
use helpline_types::Identity;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::api::AppState;
use crate::identity::Caller;

/// Create the real-time API routes.
pub fn realtime_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/realtime/stats", get(get_stats))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    caller: Caller,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, caller.0))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    // Register with the broker
    let (connection, mut receiver) = match state.broker.connect() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to register connection: {}", e);
            return;
        }
    };

    let connection_id = connection.id.clone();
    info!(connection_id = %connection_id, user_id = %identity.user_id, "WebSocket client connected");

    // Split the WebSocket into sender and receiver
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward broker pushes to the socket
    let connection_id_clone = connection_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(payload) = receiver.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        debug!(connection_id = %connection_id_clone, "Send task ended");
    });

    // Handle incoming control messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let text_str: &str = &text;
                match serde_json::from_str::<ClientCommand>(text_str) {
                    // Typing carries the caller's identity, so it goes
                    // through the service, not the broker directly.
                    Ok(ClientCommand::Typing { ticket_id }) => {
                        state.service.broadcast_typing(
                            &ticket_id,
                            &identity.user_id,
                            &identity.display_name,
                            &connection_id,
                        );
                    }
                    Ok(cmd) => {
                        let reply = state.broker.handle_command(&connection, cmd);
                        if let Ok(json) = serde_json::to_string(&reply) {
                            let _ = connection.send(json);
                        }
                    }
                    Err(e) => {
                        debug!(connection_id = %connection_id, error = %e, "Invalid message format");
                        let error_msg = ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        };
                        if let Ok(json) = serde_json::to_string(&error_msg) {
                            let _ = connection.send(json);
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => {
                debug!(connection_id = %connection_id, "WebSocket close received");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Axum answers with a pong automatically, just log it
                debug!(connection_id = %connection_id, "Ping received, len={}", data.len());
            }
            Ok(Message::Pong(_)) => {
                // Ignore pong
            }
            Ok(Message::Binary(_)) => {
                // We don't support binary messages
                debug!(connection_id = %connection_id, "Binary message ignored");
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Clean up
    send_task.abort();
    state.broker.disconnect(&connection_id);
    info!(connection_id = %connection_id, "WebSocket client disconnected");
}

/// Statistics response.
#[derive(Serialize)]
struct StatsResponse {
    current_connections: usize,
    active_rooms: usize,
    total_connections: u64,
    total_joins: u64,
    events_published: u64,
    delivery_failures: u64,
}

/// Get live connection statistics.
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.broker.stats();
    Json(StatsResponse {
        current_connections: stats.current_connections,
        active_rooms: stats.active_rooms,
        total_connections: stats.total_connections,
        total_joins: stats.total_joins,
        events_published: stats.events_published,
        delivery_failures: stats.delivery_failures,
    })
}
