use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Json, Router,
};
use chrono::DateTime;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    bookings::BookingResponse, error::AppError, messages::MessageResponse,
    middleware::auth::Claims, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/events/stream", get(stream_events))
        .route("/v1/events/replay", get(replay_events))
}

/// GET /v1/events/stream
/// Live per-user channel: every event addressed to the caller, from every
/// booking and conversation they are involved in. Clients filter by
/// payload fields.
async fn stream_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.dispatcher.subscribe(claims.sub).await;

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let name = event.kind.as_str();
                match serde_json::to_string(&event) {
                    Ok(data) => Some(Ok::<_, Infallible>(Event::default().event(name).data(data))),
                    Err(_) => None,
                }
            }
            // Lagged receiver dropped events; the client reconciles via
            // the replay endpoint
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub struct ReplayQuery {
    /// Unix seconds; defaults to the epoch.
    pub since: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub bookings: Vec<BookingResponse>,
    pub messages: Vec<MessageResponse>,
}

/// GET /v1/events/replay?since=
/// The durable read path behind the best-effort stream: push payloads are
/// hints, this is the truth a reconnecting client reconciles against.
async fn replay_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ReplayQuery>,
) -> Result<Json<ReplayResponse>, AppError> {
    let since = DateTime::from_timestamp(query.since.unwrap_or(0), 0)
        .ok_or_else(|| AppError::BadRequest("invalid since timestamp".into()))?;

    let bookings = state.coordinator.replay(claims.sub, since).await?;
    let messages = state.chat.received_since(claims.sub, since).await?;

    Ok(Json(ReplayResponse {
        bookings: bookings.into_iter().map(Into::into).collect(),
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}
