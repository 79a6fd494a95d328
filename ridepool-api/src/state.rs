use std::sync::Arc;

use ridepool_booking::{BookingLedger, Coordinator};
use ridepool_chat::{ChatService, ConversationLedger};
use ridepool_core::{BookingStore, RideStore};
use ridepool_dispatch::EventDispatcher;
use ridepool_inventory::RideInventory;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub rides: Arc<dyn RideStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub coordinator: Arc<Coordinator>,
    pub chat: Arc<ChatService>,
    pub dispatcher: Arc<EventDispatcher>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire the stores, the coordinator and the dispatcher together.
    pub fn new(auth: AuthConfig, channel_capacity: usize) -> Self {
        let rides = Arc::new(RideInventory::new());
        let bookings = Arc::new(BookingLedger::new());
        let messages = Arc::new(ConversationLedger::new());
        let dispatcher = Arc::new(EventDispatcher::new(channel_capacity));

        let coordinator = Arc::new(Coordinator::new(
            rides.clone(),
            bookings.clone(),
            dispatcher.clone(),
        ));
        let chat = Arc::new(ChatService::new(
            messages,
            bookings.clone(),
            rides.clone(),
            dispatcher.clone(),
        ));

        Self {
            rides,
            bookings,
            coordinator,
            chat,
            dispatcher,
            auth,
        }
    }
}
