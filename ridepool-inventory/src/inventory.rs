use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ridepool_core::{DomainError, Ride, RideStatus, RideStore};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory ride inventory.
///
/// Each mutating operation holds the write lock for its full duration, so
/// the capacity check and the seat increment in `commit` are one atomic
/// step. `confirmed_seats` is never written anywhere else.
pub struct RideInventory {
    rides: RwLock<HashMap<Uuid, Ride>>,
}

impl RideInventory {
    pub fn new() -> Self {
        Self {
            rides: RwLock::new(HashMap::new()),
        }
    }

    fn check_capacity(ride: &Ride, seats: i32) -> Result<(), DomainError> {
        if ride.status != RideStatus::Open {
            return Err(DomainError::RideClosed(ride.id));
        }
        if ride.confirmed_seats + seats > ride.total_seats {
            return Err(DomainError::CapacityExceeded {
                requested: seats,
                remaining: ride.remaining_seats(),
            });
        }
        Ok(())
    }
}

impl Default for RideInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RideStore for RideInventory {
    async fn insert(&self, ride: Ride) -> Result<Ride, DomainError> {
        if ride.total_seats < 1 {
            return Err(DomainError::InvalidSeatCount(ride.total_seats));
        }
        let mut rides = self.rides.write().await;
        rides.insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn get(&self, ride_id: Uuid) -> Result<Ride, DomainError> {
        let rides = self.rides.read().await;
        rides
            .get(&ride_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("ride {}", ride_id)))
    }

    async fn list_for_driver(&self, driver_id: Uuid) -> Result<Vec<Ride>, DomainError> {
        let rides = self.rides.read().await;
        let mut found: Vec<Ride> = rides
            .values()
            .filter(|r| r.driver_id == driver_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.departure_time);
        Ok(found)
    }

    async fn list_open_departed(&self, cutoff: DateTime<Utc>) -> Result<Vec<Ride>, DomainError> {
        let rides = self.rides.read().await;
        let mut found: Vec<Ride> = rides
            .values()
            .filter(|r| r.is_open() && r.has_departed(cutoff))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.departure_time);
        Ok(found)
    }

    async fn reserve(&self, ride_id: Uuid, seats: i32) -> Result<(), DomainError> {
        let rides = self.rides.read().await;
        let ride = rides
            .get(&ride_id)
            .ok_or_else(|| DomainError::NotFound(format!("ride {}", ride_id)))?;
        Self::check_capacity(ride, seats)
    }

    async fn commit(&self, ride_id: Uuid, seats: i32) -> Result<Ride, DomainError> {
        let mut rides = self.rides.write().await;
        let ride = rides
            .get_mut(&ride_id)
            .ok_or_else(|| DomainError::NotFound(format!("ride {}", ride_id)))?;
        Self::check_capacity(ride, seats)?;
        ride.confirmed_seats += seats;
        ride.updated_at = Utc::now();
        debug!(%ride_id, seats, confirmed = ride.confirmed_seats, "seats committed");
        Ok(ride.clone())
    }

    async fn release(&self, ride_id: Uuid, seats: i32) -> Result<Ride, DomainError> {
        let mut rides = self.rides.write().await;
        let ride = rides
            .get_mut(&ride_id)
            .ok_or_else(|| DomainError::NotFound(format!("ride {}", ride_id)))?;
        ride.confirmed_seats = (ride.confirmed_seats - seats).max(0);
        ride.updated_at = Utc::now();
        debug!(%ride_id, seats, confirmed = ride.confirmed_seats, "seats released");
        Ok(ride.clone())
    }

    async fn close(&self, ride_id: Uuid, target: RideStatus) -> Result<Ride, DomainError> {
        let mut rides = self.rides.write().await;
        let ride = rides
            .get_mut(&ride_id)
            .ok_or_else(|| DomainError::NotFound(format!("ride {}", ride_id)))?;
        if ride.status == target {
            // Idempotent re-close
            return Ok(ride.clone());
        }
        if ride.status != RideStatus::Open || target == RideStatus::Open {
            return Err(DomainError::InvalidTransition {
                from: ride.status.to_string(),
                to: target.to_string(),
            });
        }
        ride.status = target;
        ride.updated_at = Utc::now();
        Ok(ride.clone())
    }
}
