//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol for the chat rooms.

use chrono::{DateTime, Utc};
use drug_discovery_core::domain::ChatMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Publishes a message to the connection's room.
    ///
    /// The id is chosen by the client; re-sending the same id is delivered at most once.
    Send { id: Uuid, body: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the subscription to a room.
    Joined { room: String },

    /// A message published to the room, including the client's own messages.
    Message {
        id: Uuid,
        room: String,
        sender_id: Uuid,
        body: String,
        sent_at: DateTime<Utc>,
    },

    /// Reports a problem with the last client frame. The connection stays open.
    Error { message: String },
}

impl From<ChatMessage> for ServerMessage {
    fn from(m: ChatMessage) -> Self {
        ServerMessage::Message {
            id: m.id,
            room: m.room,
            sender_id: m.sender_id,
            body: m.body,
            sent_at: m.sent_at,
        }
    }
}
