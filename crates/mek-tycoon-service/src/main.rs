//! Mek Tycoon Service - HTTP API for the Mek Tycoon economy
//!
//! This is the main entry point for the mek-tycoon service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mek_tycoon_core::AccrualCap;
use mek_tycoon_service::{create_router, jobs, AppState, ServiceConfig};
use mek_tycoon_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mek_tycoon=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mek Tycoon Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        blockfrost_configured = %config.blockfrost_project_id.is_some(),
        gold_cap_hours = ?config.gold_cap_hours,
        reservation_timeout_seconds = config.reservation_timeout_seconds,
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // TENURE_CAP_HOURS overrides the stored tenure window
    if config.tenure_cap_hours.is_some() {
        let mut settings = store.get_tenure_settings()?;
        settings.cap = AccrualCap::from_hours(config.tenure_cap_hours);
        store.put_tenure_settings(&settings)?;
        tracing::info!(cap = ?settings.cap, "Tenure cap set from environment");
    }

    // Build app state
    let state = AppState::new(store, config.clone());

    // Start leaderboard refresh and cleanup
    let _jobs = jobs::spawn(Arc::new(state.clone()));

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
