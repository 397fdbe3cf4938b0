//! Campaign and reservation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{
    Campaign, CampaignBook, CampaignId, InventoryItem, PaymentWindow, ReleaseReason, Reservation,
    ReservationId, StakeAddress, TycoonError,
};
use mek_tycoon_store::Store;

use super::parse_id;
use crate::auth::AuthWallet;
use crate::error::ApiError;
use crate::state::AppState;

/// A reservation with its time left.
#[derive(Debug, Serialize)]
pub struct ReservationView {
    /// The reservation.
    #[serde(flatten)]
    pub reservation: Reservation,
    /// Whether it still holds its NFT.
    pub is_live: bool,
    /// Milliseconds until expiry.
    pub remaining_ms: i64,
    /// Whether the payment page is open.
    pub payment_window_open: bool,
}

impl ReservationView {
    /// Build a view valued at `now`.
    #[must_use]
    pub fn new(reservation: &Reservation, now: DateTime<Utc>) -> Self {
        Self {
            is_live: reservation.is_live(now),
            remaining_ms: reservation.remaining_millis(now),
            payment_window_open: reservation.is_payment_window_open(),
            reservation: reservation.clone(),
        }
    }
}

/// Get a campaign and its counters.
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    let id: CampaignId = parse_id(&id, "campaign id")?;
    let book = state
        .store
        .get_campaign(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {id} not found")))?;

    Ok(Json(book.campaign))
}

/// Reservation response.
#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    /// The reservation.
    pub reservation: ReservationView,
    /// The reserved NFT.
    pub nft: InventoryItem,
    /// Whether the wallet already held this reservation.
    pub is_existing: bool,
}

/// Reserve an NFT for the caller.
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(id): Path<String>,
) -> Result<Json<ReserveResponse>, ApiError> {
    let id: CampaignId = parse_id(&id, "campaign id")?;
    let now = Utc::now();
    let policy = state.reservation_policy();

    let outcome = state
        .store
        .update_campaign(&id, |book| book.reserve(&auth.wallet, now, policy))?;

    if outcome.swept > 0 {
        tracing::info!(campaign_id = %id, swept = outcome.swept, "Released stale reservations");
    }
    tracing::info!(
        campaign_id = %id,
        wallet = %auth.wallet.short(),
        reservation_id = %outcome.reservation.id,
        nft_number = outcome.nft.nft_number,
        is_existing = outcome.is_existing,
        "NFT reserved"
    );

    Ok(Json(ReserveResponse {
        reservation: ReservationView::new(&outcome.reservation, now),
        nft: outcome.nft,
        is_existing: outcome.is_existing,
    }))
}

/// The caller's reservation in a campaign.
#[derive(Debug, Serialize)]
pub struct MyReservationResponse {
    /// Live reservation, if any.
    pub reservation: Option<ReservationView>,
}

/// Get the caller's live reservation.
pub async fn my_reservation(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(id): Path<String>,
) -> Result<Json<MyReservationResponse>, ApiError> {
    let id: CampaignId = parse_id(&id, "campaign id")?;
    let book = state
        .store
        .get_campaign(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {id} not found")))?;
    let now = Utc::now();

    Ok(Json(MyReservationResponse {
        reservation: book
            .live_reservation(&auth.wallet, now)
            .map(|r| ReservationView::new(r, now)),
    }))
}

fn ensure_holder(book: &CampaignBook, id: ReservationId, wallet: &StakeAddress) -> mek_tycoon_core::Result<()> {
    match book.reservation(id) {
        Some(reservation) if &reservation.reserved_by == wallet => Ok(()),
        Some(_) => Err(TycoonError::Forbidden(format!(
            "reservation {id} belongs to another wallet"
        ))),
        None => Err(TycoonError::ReservationNotActive {
            id: id.to_string(),
            status: "missing".to_string(),
        }),
    }
}

fn campaign_of(state: &AppState, id: ReservationId) -> Result<CampaignId, ApiError> {
    state
        .store
        .campaign_for_reservation(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Reservation {id} not found")))
}

/// Release response.
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    /// Whether the reservation was released.
    pub released: bool,
    /// The campaign afterwards.
    pub campaign: Campaign,
}

/// Cancel the caller's reservation.
pub async fn release_reservation(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(id): Path<String>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let id: ReservationId = parse_id(&id, "reservation id")?;
    let campaign_id = campaign_of(&state, id)?;
    let now = Utc::now();

    let campaign = state.store.update_campaign(&campaign_id, |book| {
        ensure_holder(book, id, &auth.wallet)?;
        book.release(id, ReleaseReason::Cancelled, now)?;
        Ok(book.campaign.clone())
    })?;

    tracing::info!(
        campaign_id = %campaign_id,
        reservation_id = %id,
        wallet = %auth.wallet.short(),
        "Reservation cancelled"
    );

    Ok(Json(ReleaseResponse {
        released: true,
        campaign,
    }))
}

/// Payment window request.
#[derive(Debug, Deserialize)]
pub struct PaymentWindowRequest {
    /// `opened` or `closed`.
    pub state: PaymentWindow,
}

/// Record that the payment page was opened or closed.
pub async fn payment_window(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(id): Path<String>,
    Json(body): Json<PaymentWindowRequest>,
) -> Result<Json<ReservationView>, ApiError> {
    let id: ReservationId = parse_id(&id, "reservation id")?;
    let campaign_id = campaign_of(&state, id)?;
    let now = Utc::now();

    let reservation = state.store.update_campaign(&campaign_id, |book| {
        ensure_holder(book, id, &auth.wallet)?;
        book.mark_payment_window(id, body.state, now)
    })?;

    tracing::debug!(reservation_id = %id, window = ?body.state, "Payment window updated");

    Ok(Json(ReservationView::new(&reservation, now)))
}
