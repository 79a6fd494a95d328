use std::collections::HashMap;

use ridepool_core::Notification;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Per-user fan-out of lifecycle and chat notifications.
///
/// One broadcast channel per recipient user; every live receiver for that
/// user (multiple tabs, multiple devices) gets every event addressed to
/// them and filters client-side by payload fields. Delivery is
/// best-effort and at-most-once per live subscription: the channel holds
/// no durable state, and a reconnecting client reconciles through the
/// replay read path instead.
pub struct EventDispatcher {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<Notification>>>,
    capacity: usize,
}

impl EventDispatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Open a live subscription for `user_id`.
    pub async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.write().await;
        match channels.get(&user_id) {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(self.capacity);
                channels.insert(user_id, tx);
                rx
            }
        }
    }

    /// Deliver `event` to every live subscription for `user_id`, returning
    /// how many received it. Never blocks the caller and never surfaces an
    /// error: a recipient with no live subscription simply misses the push.
    pub async fn publish(&self, user_id: Uuid, event: Notification) -> usize {
        let mut channels = self.channels.write().await;
        let Some(tx) = channels.get(&user_id) else {
            debug!(%user_id, kind = event.kind.as_str(), "no live channel, event dropped");
            return 0;
        };
        if tx.receiver_count() == 0 {
            // All receivers disconnected since the last publish
            channels.remove(&user_id);
            debug!(%user_id, kind = event.kind.as_str(), "pruned idle channel, event dropped");
            return 0;
        }
        tx.send(event).unwrap_or(0)
    }

    /// Live receiver count for a user.
    pub async fn live_subscriptions(&self, user_id: Uuid) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&user_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}
