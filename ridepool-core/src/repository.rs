use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::error::DomainError;
use crate::message::Message;
use crate::ride::{Ride, RideStatus};

/// Persistent ride records plus the seat-accounting primitives.
///
/// `commit` and `release` are the only writers of `confirmed_seats`;
/// implementations must make the check-and-increment in `commit` a single
/// atomic step against the store.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert(&self, ride: Ride) -> Result<Ride, DomainError>;

    async fn get(&self, ride_id: Uuid) -> Result<Ride, DomainError>;

    async fn list_for_driver(&self, driver_id: Uuid) -> Result<Vec<Ride>, DomainError>;

    /// Open rides whose departure time is at or before `cutoff`, for the
    /// completion sweeper.
    async fn list_open_departed(&self, cutoff: DateTime<Utc>) -> Result<Vec<Ride>, DomainError>;

    /// Advisory capacity check: verifies `status == OPEN` and
    /// `confirmed_seats + seats <= total_seats` without mutating anything.
    /// Pending requests never lock seats; the same inequality is re-checked
    /// at `commit` time.
    async fn reserve(&self, ride_id: Uuid, seats: i32) -> Result<(), DomainError>;

    /// Atomically re-check capacity and increment `confirmed_seats`.
    async fn commit(&self, ride_id: Uuid, seats: i32) -> Result<Ride, DomainError>;

    /// Decrement `confirmed_seats`, saturating at zero.
    async fn release(&self, ride_id: Uuid, seats: i32) -> Result<Ride, DomainError>;

    /// Move the ride to a terminal status. Idempotent for a matching
    /// target; switching a closed ride's terminal status is an
    /// `InvalidTransition`.
    async fn close(&self, ride_id: Uuid, target: RideStatus) -> Result<Ride, DomainError>;
}

/// Persistent booking records. Status changes go through `transition`,
/// a conditional update keyed on the expected prior status.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<Booking, DomainError>;

    async fn get(&self, booking_id: Uuid) -> Result<Booking, DomainError>;

    /// Conditional update: succeeds only if the booking is still in
    /// `expected`, otherwise `InvalidTransition` (the caller reloads and
    /// retries or abandons). Stamps `decided_at` when `to` is a decision
    /// outcome.
    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, DomainError>;

    async fn list_for_ride(&self, ride_id: Uuid) -> Result<Vec<Booking>, DomainError>;

    async fn list_for_passenger(&self, passenger_id: Uuid) -> Result<Vec<Booking>, DomainError>;

    /// Bookings touched at or after `since`, oldest first, for replay.
    async fn updated_since(&self, since: DateTime<Utc>) -> Result<Vec<Booking>, DomainError>;
}

/// Persistent message history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: Message) -> Result<Message, DomainError>;

    async fn get(&self, message_id: Uuid) -> Result<Message, DomainError>;

    /// Flip `read` once; only the receiver may do so, and repeating the
    /// call is a no-op success.
    async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<Message, DomainError>;

    /// Chronological history between two users, either direction.
    async fn conversation(&self, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>, DomainError>;

    /// Messages addressed to `receiver_id` at or after `since`, for replay.
    async fn received_since(
        &self,
        receiver_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, DomainError>;
}
