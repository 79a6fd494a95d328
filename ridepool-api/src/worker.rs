use std::sync::Arc;

use chrono::Utc;
use ridepool_booking::Coordinator;
use tokio::time::{interval, Duration};
use tracing::{error, info};

/// Background sweeper: rides whose departure time has passed are closed
/// as COMPLETED and their confirmed bookings settled, so completion does
/// not depend on the driver remembering to call it.
pub async fn start_completion_sweeper(coordinator: Arc<Coordinator>, interval_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(interval_seconds));
    info!(interval_seconds, "completion sweeper started");

    loop {
        ticker.tick().await;
        match coordinator.complete_departed(Utc::now()).await {
            Ok(0) => {}
            Ok(swept) => info!(swept, "completed departed rides"),
            Err(e) => error!("completion sweep failed: {}", e),
        }
    }
}
