pub mod booking;
pub mod error;
pub mod events;
pub mod message;
pub mod repository;
pub mod ride;

pub use booking::{Booking, BookingStatus, Decision};
pub use error::DomainError;
pub use events::{Notification, NotificationKind};
pub use message::Message;
pub use repository::{BookingStore, MessageStore, RideStore};
pub use ride::{Ride, RideStatus};
