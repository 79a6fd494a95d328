use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use ridepool_core::{Ride, RideStatus, RideStore};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::Claims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub total_seats: i32,
}

#[derive(Debug, Serialize)]
pub struct RideResponse {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub total_seats: i32,
    pub confirmed_seats: i32,
    pub remaining_seats: i32,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Ride> for RideResponse {
    fn from(ride: Ride) -> Self {
        Self {
            id: ride.id,
            driver_id: ride.driver_id,
            origin: ride.origin.clone(),
            destination: ride.destination.clone(),
            departure_time: ride.departure_time,
            total_seats: ride.total_seats,
            confirmed_seats: ride.confirmed_seats,
            remaining_seats: ride.remaining_seats(),
            status: ride.status,
            created_at: ride.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rides", post(create_ride).get(list_rides))
        .route("/v1/rides/{id}", get(get_ride))
        .route("/v1/rides/{id}/cancel", post(cancel_ride))
        .route("/v1/rides/{id}/complete", post(complete_ride))
}

/// POST /v1/rides
/// Driver publishes a seat-limited ride. Plain boundary CRUD: the
/// coordinator only ever reads these records.
async fn create_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRideRequest>,
) -> Result<Json<RideResponse>, AppError> {
    let ride = state
        .rides
        .insert(Ride::new(
            claims.sub,
            req.origin,
            req.destination,
            req.departure_time,
            req.total_seats,
        ))
        .await?;
    info!(ride_id = %ride.id, driver_id = %claims.sub, "ride published");
    Ok(Json(ride.into()))
}

/// GET /v1/rides/:id
async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideResponse>, AppError> {
    let ride = state.rides.get(ride_id).await?;
    Ok(Json(ride.into()))
}

/// GET /v1/rides
/// The caller's own rides, soonest departure first.
async fn list_rides(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RideResponse>>, AppError> {
    let rides = state.rides.list_for_driver(claims.sub).await?;
    Ok(Json(rides.into_iter().map(Into::into).collect()))
}

/// POST /v1/rides/:id/cancel
/// Cascades to every non-terminal booking on the ride.
async fn cancel_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideResponse>, AppError> {
    let ride = state.coordinator.cancel_ride(ride_id, claims.sub).await?;
    Ok(Json(ride.into()))
}

/// POST /v1/rides/:id/complete
async fn complete_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideResponse>, AppError> {
    let ride = state.coordinator.complete_ride(ride_id, claims.sub).await?;
    Ok(Json(ride.into()))
}
