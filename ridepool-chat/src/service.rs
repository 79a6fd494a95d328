use std::sync::Arc;

use chrono::{DateTime, Utc};
use ridepool_core::{
    BookingStore, DomainError, Message, MessageStore, Notification, RideStore,
};
use ridepool_dispatch::EventDispatcher;
use tracing::{debug, info};
use uuid::Uuid;

/// Chat between a ride's two parties. Messages never touch seat
/// inventory; the only cross-reference is the optional booking scope,
/// validated against the durable booking/ride records.
pub struct ChatService {
    messages: Arc<dyn MessageStore>,
    bookings: Arc<dyn BookingStore>,
    rides: Arc<dyn RideStore>,
    dispatcher: Arc<EventDispatcher>,
}

impl ChatService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        bookings: Arc<dyn BookingStore>,
        rides: Arc<dyn RideStore>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            messages,
            bookings,
            rides,
            dispatcher,
        }
    }

    /// Persist a message and push `message.new` to the receiver.
    ///
    /// When `booking_id` is given, sender and receiver must be exactly
    /// that booking's passenger/driver pair; on mismatch nothing is
    /// written.
    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        booking_id: Option<Uuid>,
    ) -> Result<Message, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::InvalidMessage("content is empty".into()));
        }
        if sender_id == receiver_id {
            return Err(DomainError::Forbidden(
                "sender and receiver must differ".into(),
            ));
        }
        if let Some(booking_id) = booking_id {
            let booking = self.bookings.get(booking_id).await?;
            let ride = self.rides.get(booking.ride_id).await?;
            let parties = [booking.passenger_id, ride.driver_id];
            if !parties.contains(&sender_id) || !parties.contains(&receiver_id) {
                return Err(DomainError::Forbidden(
                    "sender and receiver must be the booking's passenger and driver".into(),
                ));
            }
        }

        let message = self
            .messages
            .insert(Message::new(sender_id, receiver_id, content, booking_id))
            .await?;
        info!(message_id = %message.id, %receiver_id, "message sent");

        let delivered = self
            .dispatcher
            .publish(receiver_id, Notification::message_new(&message))
            .await;
        debug!(message_id = %message.id, delivered, "message event published");
        Ok(message)
    }

    pub async fn mark_read(
        &self,
        message_id: Uuid,
        reader_id: Uuid,
    ) -> Result<Message, DomainError> {
        self.messages.mark_read(message_id, reader_id).await
    }

    pub async fn conversation(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Vec<Message>, DomainError> {
        self.messages.conversation(user_a, user_b).await
    }

    pub async fn received_since(
        &self,
        receiver_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, DomainError> {
        self.messages.received_since(receiver_id, since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ConversationLedger;
    use chrono::Duration;
    use ridepool_booking::BookingLedger;
    use ridepool_core::{Booking, NotificationKind, Ride};
    use ridepool_inventory::RideInventory;

    struct Fixture {
        chat: ChatService,
        dispatcher: Arc<EventDispatcher>,
        messages: Arc<ConversationLedger>,
        driver: Uuid,
        passenger: Uuid,
        booking_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let rides = Arc::new(RideInventory::new());
        let bookings = Arc::new(BookingLedger::new());
        let messages = Arc::new(ConversationLedger::new());
        let dispatcher = Arc::new(EventDispatcher::new(16));

        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let ride = rides
            .insert(Ride::new(
                driver,
                "Lyon",
                "Paris",
                Utc::now() + Duration::hours(2),
                4,
            ))
            .await
            .unwrap();
        let booking = bookings
            .insert(Booking::new(ride.id, passenger, 2))
            .await
            .unwrap();

        let chat = ChatService::new(
            messages.clone(),
            bookings,
            rides,
            dispatcher.clone(),
        );
        Fixture {
            chat,
            dispatcher,
            messages,
            driver,
            passenger,
            booking_id: booking.id,
        }
    }

    #[tokio::test]
    async fn test_send_scoped_message_and_notify() {
        let f = fixture().await;
        let mut driver_rx = f.dispatcher.subscribe(f.driver).await;

        let message = f
            .chat
            .send(
                f.passenger,
                f.driver,
                "see you at the station".into(),
                Some(f.booking_id),
            )
            .await
            .unwrap();
        assert!(!message.read);

        let event = driver_rx.try_recv().unwrap();
        assert_eq!(event.kind, NotificationKind::MessageNew);
        assert_eq!(event.message_id, Some(message.id));
        assert_eq!(event.booking_id, Some(f.booking_id));
    }

    #[tokio::test]
    async fn test_scoped_send_rejects_non_party_without_writing() {
        let f = fixture().await;
        let outsider = Uuid::new_v4();

        let err = f
            .chat
            .send(outsider, f.driver, "let me in".into(), Some(f.booking_id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        // Nothing was persisted
        let history = f.messages.conversation(outsider, f.driver).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_receiver_only_and_idempotent() {
        let f = fixture().await;
        let message = f
            .chat
            .send(f.driver, f.passenger, "running late".into(), None)
            .await
            .unwrap();

        let err = f.chat.mark_read(message.id, f.driver).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let read = f.chat.mark_read(message.id, f.passenger).await.unwrap();
        assert!(read.read);
        // Second call is a no-op success
        let read = f.chat.mark_read(message.id, f.passenger).await.unwrap();
        assert!(read.read);
    }

    #[tokio::test]
    async fn test_validation_rejects_empty_and_self_messages() {
        let f = fixture().await;

        let err = f
            .chat
            .send(f.driver, f.passenger, "   ".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidMessage(_)));

        let err = f
            .chat
            .send(f.driver, f.driver, "note to self".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_conversation_reads_both_directions_in_order() {
        let f = fixture().await;
        f.chat
            .send(f.passenger, f.driver, "hello".into(), None)
            .await
            .unwrap();
        f.chat
            .send(f.driver, f.passenger, "hi there".into(), None)
            .await
            .unwrap();

        let history = f.chat.conversation(f.driver, f.passenger).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "hi there");
    }
}
