use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ridepool_core::{
    Booking, BookingStatus, BookingStore, Decision, DomainError, Notification, Ride, RideStatus,
    RideStore,
};
use ridepool_dispatch::EventDispatcher;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owns every booking state transition and the seat-accounting handshake
/// with the ride inventory.
///
/// Callers supply the acting user id; roles (driver vs. passenger) are
/// re-derived from the durable ride/booking records on every privileged
/// call rather than trusted from the caller. Notifications are published
/// only after the durable mutation, fire-and-forget: a dispatcher with no
/// live subscriber never fails or rolls back a transition.
pub struct Coordinator {
    rides: Arc<dyn RideStore>,
    bookings: Arc<dyn BookingStore>,
    dispatcher: Arc<EventDispatcher>,
}

impl Coordinator {
    pub fn new(
        rides: Arc<dyn RideStore>,
        bookings: Arc<dyn BookingStore>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            rides,
            bookings,
            dispatcher,
        }
    }

    /// Create a PENDING booking for `num_seats` on a ride.
    ///
    /// The capacity check here is advisory only: pending requests do not
    /// lock seats, and several pending requests may jointly exceed the
    /// remaining capacity. The driver chooses among them; `commit` at
    /// approval time is the sole enforcement point.
    pub async fn request_booking(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
        num_seats: i32,
    ) -> Result<Booking, DomainError> {
        if num_seats < 1 {
            return Err(DomainError::InvalidSeatCount(num_seats));
        }
        let ride = self.rides.get(ride_id).await?;
        if ride.driver_id == passenger_id {
            return Err(DomainError::Forbidden(
                "drivers cannot book seats on their own ride".into(),
            ));
        }
        if ride.has_departed(Utc::now()) {
            return Err(DomainError::RideClosed(ride_id));
        }
        self.rides.reserve(ride_id, num_seats).await?;

        let booking = self
            .bookings
            .insert(Booking::new(ride_id, passenger_id, num_seats))
            .await?;
        info!(booking_id = %booking.id, %ride_id, num_seats, "booking requested");

        self.notify(ride.driver_id, Notification::booking_requested(&booking))
            .await;
        Ok(booking)
    }

    /// Apply the driver's decision to a PENDING booking.
    ///
    /// On APPROVE the atomic inventory `commit` is the capacity gate: if a
    /// concurrent approval has already exhausted the seats, the booking is
    /// auto-rejected so it never sticks in PENDING, and `CapacityExceeded`
    /// surfaces to the driver while the passenger gets the rejection event.
    pub async fn decide(
        &self,
        booking_id: Uuid,
        decision: Decision,
        actor_id: Uuid,
    ) -> Result<Booking, DomainError> {
        let booking = self.bookings.get(booking_id).await?;
        let ride = self.rides.get(booking.ride_id).await?;
        if ride.driver_id != actor_id {
            return Err(DomainError::Forbidden(
                "only the ride's driver may decide a booking".into(),
            ));
        }
        if booking.status != BookingStatus::Pending {
            return Err(DomainError::InvalidTransition {
                from: booking.status.to_string(),
                to: decision.target_status().to_string(),
            });
        }

        let decided = match decision {
            Decision::Reject => {
                self.bookings
                    .transition(booking_id, BookingStatus::Pending, BookingStatus::Rejected)
                    .await?
            }
            Decision::Approve => match self.rides.commit(booking.ride_id, booking.num_seats).await
            {
                Ok(_) => {
                    match self
                        .bookings
                        .transition(booking_id, BookingStatus::Pending, BookingStatus::Confirmed)
                        .await
                    {
                        Ok(confirmed) => confirmed,
                        Err(err) => {
                            // The booking left PENDING concurrently (cancel or
                            // a racing decide won the row): give the committed
                            // seats back before surfacing the conflict.
                            self.rides
                                .release(booking.ride_id, booking.num_seats)
                                .await?;
                            return Err(err);
                        }
                    }
                }
                Err(err @ DomainError::CapacityExceeded { .. }) => {
                    warn!(%booking_id, ride_id = %booking.ride_id, "approval lost the capacity race, auto-rejecting");
                    if let Ok(rejected) = self
                        .bookings
                        .transition(booking_id, BookingStatus::Pending, BookingStatus::Rejected)
                        .await
                    {
                        self.notify(rejected.passenger_id, Notification::booking_decided(&rejected))
                            .await;
                    }
                    return Err(err);
                }
                Err(err) => return Err(err),
            },
        };

        info!(%booking_id, status = %decided.status, "booking decided");
        self.notify(decided.passenger_id, Notification::booking_decided(&decided))
            .await;
        Ok(decided)
    }

    /// Cancel a PENDING or CONFIRMED booking before the ride departs.
    /// Either party may cancel; a confirmed booking releases its seats.
    pub async fn cancel(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Booking, DomainError> {
        let booking = self.bookings.get(booking_id).await?;
        let ride = self.rides.get(booking.ride_id).await?;
        let is_passenger = booking.passenger_id == actor_id;
        let is_driver = ride.driver_id == actor_id;
        if !is_passenger && !is_driver {
            return Err(DomainError::Forbidden(
                "actor is not a party to this booking".into(),
            ));
        }
        if ride.has_departed(Utc::now()) {
            return Err(DomainError::TooLateToCancel(booking_id));
        }
        let observed = booking.status;
        if !matches!(observed, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(DomainError::InvalidTransition {
                from: observed.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        // Conditional on the status the caller observed; a concurrent
        // change surfaces as InvalidTransition and nothing moves.
        let cancelled = self
            .bookings
            .transition(booking_id, observed, BookingStatus::Cancelled)
            .await?;
        if observed == BookingStatus::Confirmed {
            self.rides
                .release(booking.ride_id, booking.num_seats)
                .await?;
        }
        info!(%booking_id, was = %observed, "booking cancelled");

        let counterparty = if is_passenger {
            ride.driver_id
        } else {
            booking.passenger_id
        };
        self.notify(counterparty, Notification::booking_cancelled(&cancelled))
            .await;
        Ok(cancelled)
    }

    /// Close the ride as COMPLETED and settle its confirmed bookings.
    /// Driver-triggered; idempotent.
    pub async fn complete_ride(&self, ride_id: Uuid, actor_id: Uuid) -> Result<Ride, DomainError> {
        let ride = self.rides.get(ride_id).await?;
        if ride.driver_id != actor_id {
            return Err(DomainError::Forbidden(
                "only the ride's driver may complete it".into(),
            ));
        }
        self.finish_ride(ride_id).await
    }

    /// Cancel the ride and cascade to every non-terminal booking,
    /// releasing seats held by confirmed ones. Idempotent.
    pub async fn cancel_ride(&self, ride_id: Uuid, actor_id: Uuid) -> Result<Ride, DomainError> {
        let ride = self.rides.get(ride_id).await?;
        if ride.driver_id != actor_id {
            return Err(DomainError::Forbidden(
                "only the ride's driver may cancel it".into(),
            ));
        }
        let closed = self.rides.close(ride_id, RideStatus::Cancelled).await?;

        for booking in self.bookings.list_for_ride(ride_id).await? {
            let observed = booking.status;
            if !matches!(observed, BookingStatus::Pending | BookingStatus::Confirmed) {
                continue;
            }
            match self
                .bookings
                .transition(booking.id, observed, BookingStatus::Cancelled)
                .await
            {
                Ok(cancelled) => {
                    if observed == BookingStatus::Confirmed {
                        self.rides.release(ride_id, booking.num_seats).await?;
                    }
                    self.notify(cancelled.passenger_id, Notification::ride_cancelled(&cancelled))
                        .await;
                }
                // Raced another transition; that outcome stands
                Err(DomainError::InvalidTransition { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        info!(%ride_id, "ride cancelled");
        Ok(closed)
    }

    /// Scheduler entry point: complete every open ride whose departure
    /// time has passed. Returns how many rides were swept.
    pub async fn complete_departed(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let departed = self.rides.list_open_departed(now).await?;
        let count = departed.len();
        for ride in departed {
            debug!(ride_id = %ride.id, "completing departed ride");
            self.finish_ride(ride.id).await?;
        }
        Ok(count)
    }

    /// Durable read path for reconnecting clients: every booking the user
    /// is a party to (as passenger, or as driver of the ride) touched at
    /// or after `since`. Push payloads are reconciled against this, never
    /// trusted as authoritative.
    pub async fn replay(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DomainError> {
        let own_rides: HashSet<Uuid> = self
            .rides
            .list_for_driver(user_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let bookings = self
            .bookings
            .updated_since(since)
            .await?
            .into_iter()
            .filter(|b| b.passenger_id == user_id || own_rides.contains(&b.ride_id))
            .collect();
        Ok(bookings)
    }

    async fn finish_ride(&self, ride_id: Uuid) -> Result<Ride, DomainError> {
        let ride = self.rides.close(ride_id, RideStatus::Completed).await?;
        for booking in self.bookings.list_for_ride(ride_id).await? {
            if booking.status != BookingStatus::Confirmed {
                continue;
            }
            match self
                .bookings
                .transition(booking.id, BookingStatus::Confirmed, BookingStatus::Completed)
                .await
            {
                Ok(completed) => {
                    self.notify(completed.passenger_id, Notification::ride_completed(&completed))
                        .await;
                }
                Err(DomainError::InvalidTransition { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        info!(%ride_id, "ride completed");
        Ok(ride)
    }

    async fn notify(&self, user_id: Uuid, event: Notification) {
        let delivered = self.dispatcher.publish(user_id, event).await;
        debug!(%user_id, delivered, "notification published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::BookingLedger;
    use chrono::Duration;
    use ridepool_core::NotificationKind;
    use ridepool_inventory::RideInventory;

    fn harness() -> (
        Arc<Coordinator>,
        Arc<RideInventory>,
        Arc<BookingLedger>,
        Arc<EventDispatcher>,
    ) {
        let rides = Arc::new(RideInventory::new());
        let bookings = Arc::new(BookingLedger::new());
        let dispatcher = Arc::new(EventDispatcher::new(32));
        let coordinator = Arc::new(Coordinator::new(
            rides.clone(),
            bookings.clone(),
            dispatcher.clone(),
        ));
        (coordinator, rides, bookings, dispatcher)
    }

    async fn open_ride(rides: &RideInventory, driver: Uuid, seats: i32) -> Ride {
        rides
            .insert(Ride::new(
                driver,
                "Lyon",
                "Paris",
                Utc::now() + Duration::hours(3),
                seats,
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_then_approve_flow() {
        let (coordinator, rides, _, dispatcher) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;

        let mut driver_rx = dispatcher.subscribe(driver).await;
        let mut passenger_rx = dispatcher.subscribe(passenger).await;

        let booking = coordinator
            .request_booking(ride.id, passenger, 2)
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(
            driver_rx.try_recv().unwrap().kind,
            NotificationKind::BookingRequested
        );

        let confirmed = coordinator
            .decide(booking.id, Decision::Approve, driver)
            .await
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.decided_at.is_some());
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 2);

        let event = passenger_rx.try_recv().unwrap();
        assert_eq!(event.kind, NotificationKind::BookingDecided);
        assert_eq!(event.status, Some(BookingStatus::Confirmed));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_approvals_cannot_oversell() {
        let (coordinator, rides, bookings, _) = harness();
        let driver = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 2).await;

        // Pending requests do not lock seats, so both may coexist
        let b1 = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 2)
            .await
            .unwrap();
        let b2 = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 2)
            .await
            .unwrap();

        let c1 = coordinator.clone();
        let c2 = coordinator.clone();
        let t1 = tokio::spawn(async move { c1.decide(b1.id, Decision::Approve, driver).await });
        let t2 = tokio::spawn(async move { c2.decide(b2.id, Decision::Approve, driver).await });
        let (r1, r2) = (t1.await.unwrap(), t2.await.unwrap());

        // Exactly one approval commits; the other is auto-rejected
        assert_eq!(r1.is_ok() as u8 + r2.is_ok() as u8, 1);
        let err = if r1.is_err() {
            r1.unwrap_err()
        } else {
            r2.unwrap_err()
        };
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));

        let statuses = [
            bookings.get(b1.id).await.unwrap().status,
            bookings.get(b2.id).await.unwrap().status,
        ];
        assert!(statuses.contains(&BookingStatus::Confirmed));
        assert!(statuses.contains(&BookingStatus::Rejected));
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 2);
    }

    #[tokio::test]
    async fn test_pending_requests_may_jointly_exceed_capacity() {
        let (coordinator, rides, _, _) = harness();
        let ride = open_ride(&rides, Uuid::new_v4(), 4).await;

        let b1 = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 3)
            .await
            .unwrap();
        let b2 = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 3)
            .await
            .unwrap();
        assert_eq!(b1.status, BookingStatus::Pending);
        assert_eq!(b2.status, BookingStatus::Pending);

        // A single request above current remaining capacity is refused
        let err = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn test_reject_leaves_inventory_untouched() {
        let (coordinator, rides, _, _) = harness();
        let driver = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;

        let booking = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 2)
            .await
            .unwrap();
        let rejected = coordinator
            .decide(booking.id, Decision::Reject, driver)
            .await
            .unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 0);
    }

    #[tokio::test]
    async fn test_cancel_confirmed_booking_releases_seats() {
        let (coordinator, rides, _, _) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 5).await;

        let booking = coordinator
            .request_booking(ride.id, passenger, 3)
            .await
            .unwrap();
        coordinator
            .decide(booking.id, Decision::Approve, driver)
            .await
            .unwrap();
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 3);

        let cancelled = coordinator.cancel(booking.id, passenger).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 0);
    }

    #[tokio::test]
    async fn test_only_parties_may_act() {
        let (coordinator, rides, _, _) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;
        let booking = coordinator
            .request_booking(ride.id, passenger, 1)
            .await
            .unwrap();

        // A passenger cannot decide
        let err = coordinator
            .decide(booking.id, Decision::Approve, passenger)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        // A non-party cannot cancel
        let err = coordinator
            .cancel(booking.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_cancel_after_departure_is_too_late() {
        let (coordinator, rides, bookings, _) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = rides
            .insert(Ride::new(
                driver,
                "Lyon",
                "Paris",
                Utc::now() - Duration::hours(1),
                4,
            ))
            .await
            .unwrap();
        let booking = bookings
            .insert(Booking::new(ride.id, passenger, 1))
            .await
            .unwrap();

        let err = coordinator.cancel(booking.id, passenger).await.unwrap_err();
        assert!(matches!(err, DomainError::TooLateToCancel(_)));
    }

    #[tokio::test]
    async fn test_complete_ride_is_idempotent() {
        let (coordinator, rides, bookings, _) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;
        let booking = coordinator
            .request_booking(ride.id, passenger, 2)
            .await
            .unwrap();
        coordinator
            .decide(booking.id, Decision::Approve, driver)
            .await
            .unwrap();

        let completed = coordinator.complete_ride(ride.id, driver).await.unwrap();
        assert_eq!(completed.status, RideStatus::Completed);
        assert_eq!(
            bookings.get(booking.id).await.unwrap().status,
            BookingStatus::Completed
        );

        // Second completion: same terminal state, no double release, no error
        let again = coordinator.complete_ride(ride.id, driver).await.unwrap();
        assert_eq!(again.status, RideStatus::Completed);
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 2);
    }

    #[tokio::test]
    async fn test_cancel_ride_cascades_to_open_bookings() {
        let (coordinator, rides, bookings, dispatcher) = harness();
        let driver = Uuid::new_v4();
        let confirmed_passenger = Uuid::new_v4();
        let pending_passenger = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;

        let confirmed = coordinator
            .request_booking(ride.id, confirmed_passenger, 2)
            .await
            .unwrap();
        coordinator
            .decide(confirmed.id, Decision::Approve, driver)
            .await
            .unwrap();
        let pending = coordinator
            .request_booking(ride.id, pending_passenger, 1)
            .await
            .unwrap();

        let mut confirmed_rx = dispatcher.subscribe(confirmed_passenger).await;
        let mut pending_rx = dispatcher.subscribe(pending_passenger).await;

        let closed = coordinator.cancel_ride(ride.id, driver).await.unwrap();
        assert_eq!(closed.status, RideStatus::Cancelled);
        assert_eq!(
            bookings.get(confirmed.id).await.unwrap().status,
            BookingStatus::Cancelled
        );
        assert_eq!(
            bookings.get(pending.id).await.unwrap().status,
            BookingStatus::Cancelled
        );
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 0);

        assert_eq!(
            confirmed_rx.try_recv().unwrap().kind,
            NotificationKind::RideCancelled
        );
        assert_eq!(
            pending_rx.try_recv().unwrap().kind,
            NotificationKind::RideCancelled
        );

        // Cascade is idempotent
        coordinator.cancel_ride(ride.id, driver).await.unwrap();
        assert_eq!(rides.get(ride.id).await.unwrap().confirmed_seats, 0);
    }

    #[tokio::test]
    async fn test_decide_on_settled_booking_is_rejected() {
        let (coordinator, rides, _, _) = harness();
        let driver = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;
        let booking = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 1)
            .await
            .unwrap();
        coordinator
            .decide(booking.id, Decision::Approve, driver)
            .await
            .unwrap();

        let err = coordinator
            .decide(booking.id, Decision::Reject, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_request_validations() {
        let (coordinator, rides, _, _) = harness();
        let driver = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;

        let err = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSeatCount(0)));

        let err = coordinator
            .request_booking(ride.id, driver, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        coordinator.cancel_ride(ride.id, driver).await.unwrap();
        let err = coordinator
            .request_booking(ride.id, Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::RideClosed(_)));
    }

    #[tokio::test]
    async fn test_sweeper_completes_departed_rides() {
        let (coordinator, rides, bookings, _) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = rides
            .insert(Ride::new(
                driver,
                "Lyon",
                "Paris",
                Utc::now() - Duration::minutes(10),
                4,
            ))
            .await
            .unwrap();
        let booking = bookings
            .insert(Booking::new(ride.id, passenger, 2))
            .await
            .unwrap();
        coordinator
            .decide(booking.id, Decision::Approve, driver)
            .await
            .unwrap();

        let swept = coordinator.complete_departed(Utc::now()).await.unwrap();
        assert_eq!(swept, 1);
        assert_eq!(
            rides.get(ride.id).await.unwrap().status,
            RideStatus::Completed
        );
        assert_eq!(
            bookings.get(booking.id).await.unwrap().status,
            BookingStatus::Completed
        );

        // Nothing left to sweep
        assert_eq!(coordinator.complete_departed(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replay_scopes_to_parties() {
        let (coordinator, rides, _, _) = harness();
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = open_ride(&rides, driver, 4).await;
        let since = Utc::now() - Duration::minutes(1);

        let booking = coordinator
            .request_booking(ride.id, passenger, 1)
            .await
            .unwrap();

        let for_driver = coordinator.replay(driver, since).await.unwrap();
        assert_eq!(for_driver.len(), 1);
        assert_eq!(for_driver[0].id, booking.id);

        let for_passenger = coordinator.replay(passenger, since).await.unwrap();
        assert_eq!(for_passenger.len(), 1);

        let for_stranger = coordinator.replay(Uuid::new_v4(), since).await.unwrap();
        assert!(for_stranger.is_empty());
    }
}
