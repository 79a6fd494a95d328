use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat message between two users, optionally scoped to a booking.
/// Messages are never edited or deleted; `read` flips once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Message {
    pub fn new(
        sender_id: Uuid,
        receiver_id: Uuid,
        content: impl Into<String>,
        booking_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content: content.into(),
            booking_id,
            created_at: Utc::now(),
            read: false,
        }
    }
}
