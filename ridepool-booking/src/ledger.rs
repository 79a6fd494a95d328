use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ridepool_core::{Booking, BookingStatus, BookingStore, DomainError};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory booking ledger.
///
/// `transition` is the only status writer and is conditional on the
/// expected prior status, so a caller acting on a stale view gets
/// `InvalidTransition` instead of clobbering a concurrent change.
pub struct BookingLedger {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for BookingLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for BookingLedger {
    async fn insert(&self, booking: Booking) -> Result<Booking, DomainError> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, booking_id: Uuid) -> Result<Booking, DomainError> {
        let bookings = self.bookings.read().await;
        bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("booking {}", booking_id)))
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, DomainError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or_else(|| DomainError::NotFound(format!("booking {}", booking_id)))?;
        if booking.status != expected {
            return Err(DomainError::InvalidTransition {
                from: booking.status.to_string(),
                to: to.to_string(),
            });
        }
        let now = Utc::now();
        booking.status = to;
        booking.updated_at = now;
        if matches!(to, BookingStatus::Confirmed | BookingStatus::Rejected) {
            booking.decided_at = Some(now);
        }
        Ok(booking.clone())
    }

    async fn list_for_ride(&self, ride_id: Uuid) -> Result<Vec<Booking>, DomainError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.ride_id == ride_id)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.created_at);
        Ok(found)
    }

    async fn list_for_passenger(&self, passenger_id: Uuid) -> Result<Vec<Booking>, DomainError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.passenger_id == passenger_id)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.created_at);
        Ok(found)
    }

    async fn updated_since(&self, since: DateTime<Utc>) -> Result<Vec<Booking>, DomainError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.updated_at >= since)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.updated_at);
        Ok(found)
    }
}
