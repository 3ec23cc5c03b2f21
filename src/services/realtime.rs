//! In-process realtime hub.
//!
//! Each connected user gets a broadcast channel; every open socket of that
//! user subscribes to it. Events for users with no open socket are dropped,
//! clients catch up over the REST endpoints.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Message, SwipeAction};

/// Per-user channel capacity; slow sockets lag past this
const CHANNEL_CAPACITY: usize = 64;

/// Events pushed to clients over the socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Someone super-liked the receiver
    #[serde(rename_all = "camelCase")]
    Swipe { from_user_id: Uuid, action: SwipeAction },

    #[serde(rename_all = "camelCase")]
    Match {
        match_id: Uuid,
        /// The receiver's new partner
        user_id: Uuid,
        conversation_id: Uuid,
        compatibility_score: f64,
    },

    Message { message: Message },

    #[serde(rename_all = "camelCase")]
    Typing {
        conversation_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },

    Error { message: String },
}

/// Frames clients may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Typing {
        conversation_id: Uuid,
        #[serde(default = "default_typing")]
        is_typing: bool,
    },
    Ping,
}

fn default_typing() -> bool {
    true
}

/// Registry of per-user event channels
#[derive(Clone, Default)]
pub struct RealtimeHub {
    channels: Arc<DashMap<Uuid, broadcast::Sender<ServerEvent>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a new socket for `user_id`
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Deliver to every socket of `user_id`; returns how many received it
    pub fn publish(&self, user_id: Uuid, event: ServerEvent) -> usize {
        let delivered = match self.channels.get(&user_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => return 0,
        };

        if delivered == 0 {
            self.channels.remove_if(&user_id, |_, sender| sender.receiver_count() == 0);
        }
        delivered
    }

    pub fn publish_many(&self, user_ids: &[Uuid], event: &ServerEvent) -> usize {
        user_ids.iter().map(|id| self.publish(*id, event.clone())).sum()
    }

    /// Drop channels whose sockets are all gone
    pub fn prune(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before - self.channels.len()
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.channels
            .get(&user_id)
            .map(|sender| sender.receiver_count() > 0)
            .unwrap_or(false)
    }

    pub fn connected_users(&self) -> usize {
        self.channels.iter().filter(|entry| entry.value().receiver_count() > 0).count()
    }
}
