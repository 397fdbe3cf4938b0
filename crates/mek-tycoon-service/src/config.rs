//! Service configuration.

use std::path::Path;

use rand::Rng;
use serde::Deserialize;

use mek_tycoon_core::reservation::DEFAULT_RESERVATION_TIMEOUT_SECONDS;
use mek_tycoon_core::{AccrualCap, DEFAULT_GOLD_CAP_HOURS};

use crate::blockfrost::{DEFAULT_BLOCKFROST_API_URL, DEFAULT_MEK_POLICY_ID};

/// Length of a generated session secret.
const GENERATED_SECRET_LEN: usize = 64;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/mek-tycoon").
    pub data_dir: String,

    /// Service API key for the payment webhook.
    pub service_api_key: Option<String>,

    /// Admin API key for `/v1/admin` endpoints.
    pub admin_api_key: Option<String>,

    /// HMAC key for session tokens.
    pub session_secret: String,

    /// Optional HMAC secret for payment webhook bodies.
    pub payment_webhook_secret: Option<String>,

    /// Blockfrost API base URL.
    pub blockfrost_api_url: String,

    /// Blockfrost project id (optional; verification is disabled without it).
    pub blockfrost_project_id: Option<String>,

    /// Policy id of the Mek collection.
    pub mek_policy_id: String,

    /// Offline window for gold accrual, in hours. `None` means unlimited.
    pub gold_cap_hours: Option<u32>,

    /// Tenure cap applied at startup, in hours. `None` keeps the stored setting.
    pub tenure_cap_hours: Option<u32>,

    /// How long a reservation holds its NFT.
    pub reservation_timeout_seconds: i64,

    /// Leaderboard refresh interval.
    pub leaderboard_refresh_seconds: u64,

    /// Reservation and nonce cleanup interval.
    pub cleanup_interval_seconds: u64,

    /// Essence checkpoint interval.
    pub essence_checkpoint_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Blockfrost secrets file structure.
#[derive(Debug, Deserialize)]
struct BlockfrostSecrets {
    project_id: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (blockfrost_api_url, blockfrost_project_id) = load_blockfrost_secrets();

        let session_secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| {
            tracing::warn!("SESSION_SECRET not set - sessions will not survive a restart");
            generate_secret()
        });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/mek-tycoon".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            session_secret,
            payment_webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok(),
            blockfrost_api_url,
            blockfrost_project_id,
            mek_policy_id: std::env::var("MEK_POLICY_ID")
                .unwrap_or_else(|_| DEFAULT_MEK_POLICY_ID.into()),
            gold_cap_hours: parse_cap_hours("GOLD_CAP_HOURS", Some(DEFAULT_GOLD_CAP_HOURS)),
            tenure_cap_hours: parse_cap_hours("TENURE_CAP_HOURS", None),
            reservation_timeout_seconds: env_number(
                "RESERVATION_TIMEOUT_SECONDS",
                DEFAULT_RESERVATION_TIMEOUT_SECONDS,
            ),
            leaderboard_refresh_seconds: env_number("LEADERBOARD_REFRESH_SECONDS", 300),
            cleanup_interval_seconds: env_number("CLEANUP_INTERVAL_SECONDS", 60),
            essence_checkpoint_seconds: env_number("ESSENCE_CHECKPOINT_SECONDS", 86_400),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_number("MAX_BODY_BYTES", 1024 * 1024), // 1MB
            request_timeout_seconds: env_number("REQUEST_TIMEOUT_SECONDS", 30),
        }
    }

    /// Gold accrual cap.
    #[must_use]
    pub fn gold_cap(&self) -> AccrualCap {
        AccrualCap::from_hours(self.gold_cap_hours)
    }
}

/// Parse a numeric environment variable, falling back to `default`.
fn env_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse a cap in hours. `none`, `unlimited` and `0` disable the cap.
fn parse_cap_hours(name: &str, default: Option<u32>) -> Option<u32> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "unlimited" | "0" => None,
            value => value.parse().ok().or(default),
        },
        Err(_) => default,
    }
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Load Blockfrost secrets from file or environment.
fn load_blockfrost_secrets() -> (String, Option<String>) {
    let secret_paths = [
        ".secrets/blockfrost.json",
        "mek-tycoon/.secrets/blockfrost.json",
        "../.secrets/blockfrost.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<BlockfrostSecrets>(path) {
            tracing::info!(path = %path, "Loaded Blockfrost secrets from file");
            return (
                secrets
                    .api_url
                    .unwrap_or_else(|| DEFAULT_BLOCKFROST_API_URL.into()),
                Some(secrets.project_id),
            );
        }
    }

    tracing::debug!("Blockfrost secrets file not found, using environment variables");
    (
        std::env::var("BLOCKFROST_API_URL")
            .unwrap_or_else(|_| DEFAULT_BLOCKFROST_API_URL.into()),
        std::env::var("BLOCKFROST_PROJECT_ID").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/mek-tycoon".into(),
            service_api_key: None,
            admin_api_key: None,
            session_secret: generate_secret(),
            payment_webhook_secret: None,
            blockfrost_api_url: DEFAULT_BLOCKFROST_API_URL.into(),
            blockfrost_project_id: None,
            mek_policy_id: DEFAULT_MEK_POLICY_ID.into(),
            gold_cap_hours: Some(DEFAULT_GOLD_CAP_HOURS),
            tenure_cap_hours: None,
            reservation_timeout_seconds: DEFAULT_RESERVATION_TIMEOUT_SECONDS,
            leaderboard_refresh_seconds: 300,
            cleanup_interval_seconds: 60,
            essence_checkpoint_seconds: 86_400,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
