use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "PENDING"),
            BookingStatus::Confirmed => write!(f, "CONFIRMED"),
            BookingStatus::Rejected => write!(f, "REJECTED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
            BookingStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A driver's verdict on a pending booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> BookingStatus {
        match self {
            Decision::Approve => BookingStatus::Confirmed,
            Decision::Reject => BookingStatus::Rejected,
        }
    }
}

/// A passenger's request for `num_seats` on a ride, plus its lifecycle.
///
/// `num_seats` is fixed at creation; only `status`, `updated_at` and
/// `decided_at` mutate afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub num_seats: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(ride_id: Uuid, passenger_id: Uuid, num_seats: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ride_id,
            passenger_id,
            num_seats,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
            decided_at: None,
        }
    }
}
