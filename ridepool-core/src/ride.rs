use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Open,
    Cancelled,
    Completed,
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RideStatus::Open => write!(f, "OPEN"),
            RideStatus::Cancelled => write!(f, "CANCELLED"),
            RideStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A driver-published, seat-limited trip offer.
///
/// `confirmed_seats` is mutated only by the ride inventory store; at
/// quiescence it equals the sum of `num_seats` over the ride's confirmed
/// (and, after completion, completed) bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub total_seats: i32,
    pub confirmed_seats: i32,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(
        driver_id: Uuid,
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_time: DateTime<Utc>,
        total_seats: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            driver_id,
            origin: origin.into(),
            destination: destination.into(),
            departure_time,
            total_seats,
            confirmed_seats: 0,
            status: RideStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_seats(&self) -> i32 {
        self.total_seats - self.confirmed_seats
    }

    pub fn is_open(&self) -> bool {
        self.status == RideStatus::Open
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time <= now
    }
}
