//! Blockfrost API client implementation.

use reqwest::Client;
use std::time::Duration;

use mek_tycoon_core::StakeAddress;

use super::types::{AddressAsset, BlockfrostErrorResponse};
use super::{MAX_PAGES, PAGE_SIZE};

/// Error type for Blockfrost operations.
#[derive(Debug, thiserror::Error)]
pub enum BlockfrostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Blockfrost API returned an error.
    #[error("Blockfrost API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Blockfrost API client.
#[derive(Debug, Clone)]
pub struct BlockfrostClient {
    client: Client,
    base_url: String,
    project_id: String,
}

impl BlockfrostClient {
    /// Create a new Blockfrost client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API URL (e.g., `"https://cardano-mainnet.blockfrost.io/api/v0"`)
    /// * `project_id` - Blockfrost project id
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Result<Self, BlockfrostError> {
        let project_id = project_id.into();
        if project_id.is_empty() {
            return Err(BlockfrostError::Configuration(
                "project id must not be empty".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id,
        })
    }

    /// Every asset held by the addresses of a stake account.
    ///
    /// Pages are fetched until one comes back short or `MAX_PAGES` is reached.
    /// An unknown stake address has no assets.
    pub async fn account_assets(
        &self,
        stake_address: &StakeAddress,
    ) -> Result<Vec<AddressAsset>, BlockfrostError> {
        let mut assets = Vec::new();

        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/accounts/{}/addresses/assets?page={page}&count={PAGE_SIZE}",
                self.base_url, stake_address
            );

            let response = self
                .client
                .get(&url)
                .header("project_id", &self.project_id)
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                tracing::debug!(
                    wallet = %stake_address.short(),
                    "Stake address has no assets on chain"
                );
                break;
            }

            let batch: Vec<AddressAsset> = self.handle_response(response).await?;
            let fetched = batch.len();
            assets.extend(batch);

            tracing::debug!(
                wallet = %stake_address.short(),
                page,
                fetched,
                "Fetched Blockfrost asset page"
            );

            if fetched < PAGE_SIZE {
                break;
            }
            if page == MAX_PAGES {
                tracing::warn!(
                    wallet = %stake_address.short(),
                    pages = MAX_PAGES,
                    "Blockfrost page limit reached - asset list may be truncated"
                );
            }
        }

        Ok(assets)
    }

    /// Handle API response, parsing success or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BlockfrostError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<BlockfrostErrorResponse, _> = response.json().await;

        match error_body {
            Ok(error) => Err(BlockfrostError::Api {
                status: error.status_code,
                message: format!("{}: {}", error.error, error.message),
            }),
            Err(_) => Err(BlockfrostError::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}"),
            }),
        }
    }
}
