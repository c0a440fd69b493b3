//! services/api/src/web/chat.rs
//!
//! In-process publish/subscribe hub behind the chat WebSocket.
//!
//! Each room is a `tokio::sync::broadcast` channel created on first use. There is
//! no persistence, acknowledgement or replay: a subscriber sees what is published
//! while it is subscribed, in broadcast order.

use drug_discovery_core::domain::ChatMessage;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Messages a slow subscriber may fall behind before it starts skipping.
const ROOM_CAPACITY: usize = 256;

/// How many recent message ids a connection remembers for de-duplication.
const SEEN_WINDOW: usize = 1024;

#[derive(Default)]
pub struct ChatRooms {
    rooms: Mutex<HashMap<String, broadcast::Sender<ChatMessage>>>,
}

impl ChatRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `room`, creating it if needed.
    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<ChatMessage> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Publishes to `room` and returns how many subscribers received it.
    ///
    /// Rooms whose last subscriber has gone are dropped here.
    pub async fn publish(&self, message: ChatMessage) -> usize {
        let mut rooms = self.rooms.lock().await;
        let Some(sender) = rooms.get(&message.room) else {
            return 0;
        };
        let room = message.room.clone();
        match sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                rooms.remove(&room);
                0
            }
        }
    }

    /// Drops `room` once nobody is subscribed to it.
    pub async fn leave(&self, room: &str) {
        let mut rooms = self.rooms.lock().await;
        if rooms.get(room).is_some_and(|s| s.receiver_count() == 0) {
            rooms.remove(room);
        }
    }
}

/// Remembers the most recent message ids forwarded on one connection.
pub struct SeenMessages {
    order: VecDeque<Uuid>,
    ids: HashSet<Uuid>,
    capacity: usize,
}

impl SeenMessages {
    pub fn new() -> Self {
        Self::with_capacity(SEEN_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// True the first time `id` is seen within the window.
    pub fn first_sighting(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

impl Default for SeenMessages {
    fn default() -> Self {
        Self::new()
    }
}
