//! Common test utilities for mek-tycoon integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use tempfile::TempDir;

use mek_tycoon_core::{AccrualCap, MekNumber, MinerAccount, OwnedMek, StakeAddress};
use mek_tycoon_service::auth::issue_session;
use mek_tycoon_service::{create_router, AppState, ServiceConfig};
use mek_tycoon_store::{RocksStore, Store};

pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_API_KEY: &str = "test-admin-key";
pub const SESSION_SECRET: &str = "test-session-secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store access for seeding data.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test wallet for authenticated requests.
    pub wallet: StakeAddress,
}

/// A deterministic valid stake address.
pub fn wallet(fill: &str) -> StakeAddress {
    format!("stake1{}", fill.repeat(53)).parse().unwrap()
}

/// The base config used by every harness.
pub fn test_config(temp_dir: &TempDir) -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        service_api_key: Some(SERVICE_API_KEY.into()),
        admin_api_key: Some(ADMIN_API_KEY.into()),
        session_secret: SESSION_SECRET.into(),
        ..ServiceConfig::default()
    }
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the config.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let mut config = test_config(&temp_dir);
        adjust(&mut config);

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            wallet: wallet("a"),
        }
    }

    /// Authorization header for the harness wallet.
    pub fn user_auth_header(&self) -> String {
        Self::auth_header_for(&self.wallet)
    }

    /// Authorization header for any wallet.
    pub fn auth_header_for(wallet: &StakeAddress) -> String {
        let session = issue_session(SESSION_SECRET, wallet, Utc::now()).unwrap();
        format!("Bearer {}", session.token)
    }

    /// Create a verified account owning the given Meks at `gold_per_hour` each.
    pub fn seed_verified(&self, wallet: &StakeAddress, meks: &[u16], gold_per_hour: u64) -> MinerAccount {
        let now = Utc::now();
        self.store.get_or_create_account(wallet, now).unwrap();
        let owned = meks
            .iter()
            .map(|&n| OwnedMek {
                mek_number: MekNumber::new(n).unwrap(),
                asset_id: format!("asset{n}"),
                source_key: None,
                gold_per_hour,
            })
            .collect();
        self.store
            .apply_verification(wallet, owned, AccrualCap::default(), AccrualCap::Unlimited, now)
            .unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
