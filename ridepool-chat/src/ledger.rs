use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ridepool_core::{DomainError, Message, MessageStore};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory message history. Messages are append-only; the only
/// mutation is the receiver flipping `read`, once.
pub struct ConversationLedger {
    messages: RwLock<HashMap<Uuid, Message>>,
}

impl ConversationLedger {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for ConversationLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for ConversationLedger {
    async fn insert(&self, message: Message) -> Result<Message, DomainError> {
        let mut messages = self.messages.write().await;
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn get(&self, message_id: Uuid) -> Result<Message, DomainError> {
        let messages = self.messages.read().await;
        messages
            .get(&message_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("message {}", message_id)))
    }

    async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<Message, DomainError> {
        let mut messages = self.messages.write().await;
        let message = messages
            .get_mut(&message_id)
            .ok_or_else(|| DomainError::NotFound(format!("message {}", message_id)))?;
        if message.receiver_id != reader_id {
            return Err(DomainError::Forbidden(
                "only the receiver may mark a message read".into(),
            ));
        }
        // Idempotent: flipping an already-read message is a no-op
        message.read = true;
        Ok(message.clone())
    }

    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>, DomainError> {
        let messages = self.messages.read().await;
        let mut found: Vec<Message> = messages
            .values()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect();
        found.sort_by_key(|m| (m.created_at, m.id));
        Ok(found)
    }

    async fn received_since(
        &self,
        receiver_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, DomainError> {
        let messages = self.messages.read().await;
        let mut found: Vec<Message> = messages
            .values()
            .filter(|m| m.receiver_id == receiver_id && m.created_at >= since)
            .cloned()
            .collect();
        found.sort_by_key(|m| (m.created_at, m.id));
        Ok(found)
    }
}
