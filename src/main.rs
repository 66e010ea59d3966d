//! # HotelFlow
//!
//! Hotel booking platform with RFID key reservation.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Optional Redis client
//! - Webhook dispatcher and HTTP server

use anyhow::Result;
use tracing::info;

use hotelflow::config::Settings;
use hotelflow::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    hotelflow::telemetry::init_tracing();

    info!("Starting HotelFlow...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
