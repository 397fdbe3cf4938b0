//! Payment provider webhook.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{CampaignId, ReservationId, StakeAddress, TycoonError};
use mek_tycoon_store::Store;

use crate::auth::ServiceAuth;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the body.
pub const PAYMENT_SIGNATURE_HEADER: &str = "x-payment-signature";

/// A completed payment.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    /// Campaign paid for.
    pub campaign_id: CampaignId,
    /// Paying wallet.
    pub stake_address: StakeAddress,
    /// On-chain transaction hash.
    pub transaction_hash: String,
    /// Specific reservation, when the provider echoes it back.
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
    /// The completed reservation.
    pub reservation_id: ReservationId,
    /// NFT number sold.
    pub nft_number: u32,
}

/// Handle a payment completion.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    if let Some(secret) = &state.config.payment_webhook_secret {
        let signature = headers
            .get(PAYMENT_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing payment signature".into()))?;

        if !constant_time_eq(&hmac_sha256_hex(secret, &body), signature) {
            tracing::warn!(service = %service.service_name, "Invalid payment webhook signature");
            return Err(ApiError::BadRequest("Invalid webhook signature".into()));
        }
    }

    let webhook: PaymentWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        service = %service.service_name,
        campaign_id = %webhook.campaign_id,
        wallet = %webhook.stake_address.short(),
        tx = %webhook.transaction_hash,
        "Received payment webhook"
    );

    let now = Utc::now();
    let reservation = state.store.update_campaign(&webhook.campaign_id, |book| {
        match webhook.reservation_id {
            Some(id) => {
                if book
                    .reservation(id)
                    .is_some_and(|r| r.reserved_by != webhook.stake_address)
                {
                    return Err(TycoonError::Forbidden(format!(
                        "reservation {id} was not made by the paying wallet"
                    )));
                }
                book.complete(id, webhook.transaction_hash.clone(), now)
            }
            None => book.complete_for_wallet(
                &webhook.stake_address,
                webhook.transaction_hash.clone(),
                now,
            ),
        }
    })?;

    tracing::info!(
        campaign_id = %webhook.campaign_id,
        reservation_id = %reservation.id,
        nft_number = reservation.nft_number,
        "Reservation completed"
    );

    Ok(Json(WebhookResponse {
        received: true,
        reservation_id: reservation.id,
        nft_number: reservation.nft_number,
    }))
}
