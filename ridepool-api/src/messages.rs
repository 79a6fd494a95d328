use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use ridepool_core::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    pub booking_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            booking_id: message.booking_id,
            created_at: message.created_at,
            read: message.read,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/messages", post(send_message))
        .route("/v1/messages/{id}/read", post(mark_read))
        .route("/v1/conversations/{peer_id}", get(get_conversation))
}

/// POST /v1/messages
async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state
        .chat
        .send(claims.sub, req.receiver_id, req.content, req.booking_id)
        .await?;
    Ok(Json(message.into()))
}

/// POST /v1/messages/:id/read
async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.chat.mark_read(message_id, claims.sub).await?;
    Ok(Json(message.into()))
}

/// GET /v1/conversations/:peer_id
/// Chronological history between the caller and a peer.
async fn get_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(peer_id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = state.chat.conversation(claims.sub, peer_id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
