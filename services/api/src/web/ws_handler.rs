//! services/api/src/web/ws_handler.rs
//!
//! The WebSocket endpoint for chat rooms: upgrades the connection, forwards room
//! traffic to the client, and publishes the client's messages.

use crate::web::{
    chat::SeenMessages,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use chrono::Utc;
use drug_discovery_core::domain::ChatMessage;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ChatQuery {
    pub room: String,
}

/// The main handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ChatQuery>,
) -> impl IntoResponse {
    let room = query.room.trim().to_string();
    if room.is_empty() {
        return (StatusCode::BAD_REQUEST, "A room name is required").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id, room))
}

async fn send_json(
    sender: &Mutex<SplitSink<WebSocket, Message>>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.lock().await.send(Message::Text(text.into())).await
}

/// Manages the lifecycle of a single chat connection.
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid, room: String) {
    info!(%user_id, room = %room, "Chat connection established");

    let rx = app_state.chat_rooms.subscribe(&room).await;
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    if send_json(&sender, &ServerMessage::Joined { room: room.clone() })
        .await
        .is_err()
    {
        drop(rx);
        app_state.chat_rooms.leave(&room).await;
        return;
    }

    let forward_task = tokio::spawn(forward_room(rx, sender.clone()));

    // --- Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(ClientMessage::Send { id, body }) => {
                    let body = body.trim().to_string();
                    if body.is_empty() {
                        let error = ServerMessage::Error {
                            message: "Message body is empty".to_string(),
                        };
                        if send_json(&sender, &error).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    let delivered = app_state
                        .chat_rooms
                        .publish(ChatMessage {
                            id,
                            room: room.clone(),
                            sender_id: user_id,
                            body,
                            sent_at: Utc::now(),
                        })
                        .await;
                    debug!(message_id = %id, delivered, "Chat message published");
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                    let error = ServerMessage::Error {
                        message: "Unrecognized message".to_string(),
                    };
                    if send_json(&sender, &error).await.is_err() {
                        break;
                    }
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
    // The receiver lives in the forwarding task; wait for it to drop.
    let _ = forward_task.await;
    app_state.chat_rooms.leave(&room).await;
    info!(%user_id, room = %room, "Chat connection closed");
}

/// Relays room traffic to one client, dropping ids it has already forwarded.
async fn forward_room(
    mut rx: broadcast::Receiver<ChatMessage>,
    sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
) {
    let mut seen = SeenMessages::new();
    loop {
        match rx.recv().await {
            Ok(message) => {
                if !seen.first_sighting(message.id) {
                    debug!(message_id = %message.id, "Dropped duplicate chat message");
                    continue;
                }
                if send_json(&sender, &ServerMessage::from(message)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Chat subscriber lagged; messages skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
