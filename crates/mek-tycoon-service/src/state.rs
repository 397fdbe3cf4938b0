//! Application state.

use std::sync::Arc;

use chrono::Duration;

use mek_tycoon_core::{AccrualCap, ReservationPolicy};
use mek_tycoon_store::RocksStore;

use crate::blockfrost::BlockfrostClient;
use crate::config::ServiceConfig;

/// Application state shared across handlers and background jobs.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Blockfrost client for ownership verification (optional).
    pub blockfrost: Option<Arc<BlockfrostClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let blockfrost = config.blockfrost_project_id.as_ref().and_then(|project_id| {
            match BlockfrostClient::new(&config.blockfrost_api_url, project_id) {
                Ok(client) => {
                    tracing::info!(
                        blockfrost_url = %config.blockfrost_api_url,
                        "Blockfrost integration enabled"
                    );
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Blockfrost client");
                    None
                }
            }
        });

        if blockfrost.is_none() {
            tracing::warn!("Blockfrost not configured - ownership verification is disabled");
        }

        Self {
            store,
            config,
            blockfrost,
        }
    }

    /// Check if Blockfrost is configured.
    #[must_use]
    pub fn has_blockfrost(&self) -> bool {
        self.blockfrost.is_some()
    }

    /// Gold accrual cap.
    #[must_use]
    pub fn gold_cap(&self) -> AccrualCap {
        self.config.gold_cap()
    }

    /// Reservation timing.
    #[must_use]
    pub fn reservation_policy(&self) -> ReservationPolicy {
        ReservationPolicy {
            timeout: Duration::seconds(self.config.reservation_timeout_seconds),
            ..ReservationPolicy::default()
        }
    }
}
