use std::net::SocketAddr;

use ridepool_api::{app, worker, AppState, AuthConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ridepool_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ridepool_api::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Ridepool API on port {}", config.server.port);

    let state = AppState::new(
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        config.dispatch.channel_capacity,
    );

    // Time-triggered ride completion
    tokio::spawn(worker::start_completion_sweeper(
        state.coordinator.clone(),
        config.dispatch.sweep_interval_seconds,
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
