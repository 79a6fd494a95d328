use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::message::Message;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    #[serde(rename = "booking.requested")]
    BookingRequested,
    #[serde(rename = "booking.decided")]
    BookingDecided,
    #[serde(rename = "booking.cancelled")]
    BookingCancelled,
    #[serde(rename = "ride.cancelled")]
    RideCancelled,
    #[serde(rename = "ride.completed")]
    RideCompleted,
    #[serde(rename = "message.new")]
    MessageNew,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingRequested => "booking.requested",
            NotificationKind::BookingDecided => "booking.decided",
            NotificationKind::BookingCancelled => "booking.cancelled",
            NotificationKind::RideCancelled => "ride.cancelled",
            NotificationKind::RideCompleted => "ride.completed",
            NotificationKind::MessageNew => "message.new",
        }
    }
}

/// Payload fanned out to a recipient's live channel. Not a durability
/// source: clients reconcile against the replay read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
    pub timestamp: i64,
}

impl Notification {
    fn for_booking(kind: NotificationKind, booking: &Booking) -> Self {
        Self {
            kind,
            booking_id: Some(booking.id),
            ride_id: Some(booking.ride_id),
            message_id: None,
            status: Some(booking.status),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn booking_requested(booking: &Booking) -> Self {
        Self::for_booking(NotificationKind::BookingRequested, booking)
    }

    pub fn booking_decided(booking: &Booking) -> Self {
        Self::for_booking(NotificationKind::BookingDecided, booking)
    }

    pub fn booking_cancelled(booking: &Booking) -> Self {
        Self::for_booking(NotificationKind::BookingCancelled, booking)
    }

    pub fn ride_cancelled(booking: &Booking) -> Self {
        Self::for_booking(NotificationKind::RideCancelled, booking)
    }

    pub fn ride_completed(booking: &Booking) -> Self {
        Self::for_booking(NotificationKind::RideCompleted, booking)
    }

    pub fn message_new(message: &Message) -> Self {
        Self {
            kind: NotificationKind::MessageNew,
            booking_id: message.booking_id,
            ride_id: None,
            message_id: Some(message.id),
            status: None,
            timestamp: Utc::now().timestamp(),
        }
    }
}
