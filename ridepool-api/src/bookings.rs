use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use ridepool_core::{Booking, BookingStatus, BookingStore, Decision, DomainError, RideStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub ride_id: Uuid,
    pub num_seats: i32,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub decision: Decision,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub num_seats: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            ride_id: booking.ride_id,
            passenger_id: booking.passenger_id,
            num_seats: booking.num_seats,
            status: booking.status,
            created_at: booking.created_at,
            decided_at: booking.decided_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(request_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/decide", post(decide_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

/// POST /v1/bookings
/// Passenger requests seats; the booking lands PENDING and the driver is
/// notified.
async fn request_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .coordinator
        .request_booking(req.ride_id, claims.sub, req.num_seats)
        .await?;
    Ok(Json(booking.into()))
}

/// GET /v1/bookings/:id
/// Visible only to the booking's parties.
async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.get(booking_id).await?;
    let ride = state.rides.get(booking.ride_id).await?;
    if claims.sub != booking.passenger_id && claims.sub != ride.driver_id {
        return Err(DomainError::Forbidden("actor is not a party to this booking".into()).into());
    }
    Ok(Json(booking.into()))
}

/// GET /v1/bookings
/// The caller's booking history as a passenger.
async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.list_for_passenger(claims.sub).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// POST /v1/bookings/:id/decide
async fn decide_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<DecideRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .coordinator
        .decide(booking_id, req.decision, claims.sub)
        .await?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/:id/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.coordinator.cancel(booking_id, claims.sub).await?;
    Ok(Json(booking.into()))
}
