//! Admin handlers.
//!
//! Every endpoint requires the `X-Admin-Key` header (see [`AdminAuth`]).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{
    effective_rate, BuffId, BuffScope, Campaign, CampaignBook, CampaignId, GoldRateCurve,
    NewInventoryItem, Reservation, ReservationId, ReservationStatus, StakeAddress, TenureBuff,
    TenureSettings, TycoonError,
};
use mek_tycoon_store::Store;

use super::accounts::AccountResponse;
use super::parse_id;
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::jobs::{self, RefreshedCategory};
use crate::state::AppState;

// ============================================================================
// Campaigns
// ============================================================================

/// Campaign creation request.
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Payment provider project id.
    pub project_id: String,
    /// Inventory size limit.
    pub max_nfts: u32,
    /// Optional start.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Optional end.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(ApiError::BadRequest(
            "end_date must be after start_date".into(),
        )),
        _ => Ok(()),
    }
}

fn campaign_id(raw: &str) -> Result<CampaignId, ApiError> {
    parse_id(raw, "campaign id")
}

/// Create an inactive campaign.
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Campaign name is required".into()));
    }
    if body.max_nfts == 0 {
        return Err(ApiError::BadRequest("max_nfts must be positive".into()));
    }
    check_dates(body.start_date, body.end_date)?;

    let book = CampaignBook::new(
        name,
        body.description,
        body.project_id,
        body.max_nfts,
        body.start_date,
        body.end_date,
        Utc::now(),
    );
    state.store.create_campaign(&book)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        campaign_id = %book.campaign.id,
        name = %book.campaign.name,
        "Campaign created"
    );

    Ok(Json(book.campaign))
}

/// List every campaign.
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<Vec<Campaign>>, ApiError> {
    let campaigns = state
        .store
        .list_campaigns()?
        .into_iter()
        .map(|book| book.campaign)
        .collect();
    Ok(Json(campaigns))
}

/// Get a campaign with its inventory and reservations.
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<CampaignBook>, ApiError> {
    let id = campaign_id(&id)?;
    let book = state
        .store
        .get_campaign(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {id} not found")))?;
    Ok(Json(book))
}

/// Campaign update request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New project id.
    pub project_id: Option<String>,
    /// New inventory limit.
    pub max_nfts: Option<u32>,
    /// New start.
    pub start_date: Option<DateTime<Utc>>,
    /// New end.
    pub end_date: Option<DateTime<Utc>>,
}

/// Update campaign metadata.
pub async fn update_campaign(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
    Json(body): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, ApiError> {
    let id = campaign_id(&id)?;
    let now = Utc::now();

    let campaign = state.store.update_campaign(&id, |book| {
        let campaign = &mut book.campaign;
        if let Some(max_nfts) = body.max_nfts {
            if max_nfts == 0 || max_nfts < campaign.total_nfts {
                return Err(TycoonError::InvalidInventory(format!(
                    "max_nfts {max_nfts} is below the {} NFTs already loaded",
                    campaign.total_nfts
                )));
            }
            campaign.max_nfts = max_nfts;
        }
        let start = body.start_date.or(campaign.start_date);
        let end = body.end_date.or(campaign.end_date);
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(TycoonError::InvalidInventory(
                    "end_date must be after start_date".to_string(),
                ));
            }
        }
        if let Some(name) = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            campaign.name = name.to_string();
        }
        if let Some(description) = &body.description {
            campaign.description.clone_from(description);
        }
        if let Some(project_id) = &body.project_id {
            campaign.project_id.clone_from(project_id);
        }
        campaign.start_date = start;
        campaign.end_date = end;
        campaign.updated_at = now;
        Ok(campaign.clone())
    })?;

    tracing::info!(admin_id = %admin.admin_id, campaign_id = %id, "Campaign updated");

    Ok(Json(campaign))
}

/// Inventory load request.
#[derive(Debug, Deserialize)]
pub struct PopulateRequest {
    /// Items to load.
    pub items: Vec<NewInventoryItem>,
}

/// Inventory change response.
#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    /// Items added or removed.
    pub items: usize,
    /// Reservations removed.
    pub reservations: usize,
    /// The campaign afterwards.
    pub campaign: Campaign,
}

/// Load the inventory of an empty campaign.
pub async fn populate_inventory(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
    Json(body): Json<PopulateRequest>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let id = campaign_id(&id)?;
    let now = Utc::now();

    let (items, campaign) = state.store.update_campaign(&id, |book| {
        let added = book.populate(body.items, now)?;
        Ok((added, book.campaign.clone()))
    })?;

    tracing::info!(admin_id = %admin.admin_id, campaign_id = %id, items, "Inventory loaded");

    Ok(Json(InventoryResponse {
        items,
        reservations: 0,
        campaign,
    }))
}

/// Remove all inventory and reservations from a campaign.
pub async fn clear_inventory(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let id = campaign_id(&id)?;
    let now = Utc::now();

    let ((items, reservations), campaign) = state.store.update_campaign(&id, |book| {
        let cleared = book.clear_inventory(now);
        Ok((cleared, book.campaign.clone()))
    })?;

    tracing::warn!(
        admin_id = %admin.admin_id,
        campaign_id = %id,
        items,
        reservations,
        "Inventory cleared"
    );

    Ok(Json(InventoryResponse {
        items,
        reservations,
        campaign,
    }))
}

/// Open a campaign for reservations.
pub async fn activate_campaign(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    let id = campaign_id(&id)?;
    let now = Utc::now();
    let campaign = state.store.update_campaign(&id, |book| {
        book.activate(now)?;
        Ok(book.campaign.clone())
    })?;

    tracing::info!(admin_id = %admin.admin_id, campaign_id = %id, "Campaign activated");
    Ok(Json(campaign))
}

/// Stop taking reservations.
pub async fn deactivate_campaign(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    let id = campaign_id(&id)?;
    let now = Utc::now();
    let campaign = state.store.update_campaign(&id, |book| {
        book.deactivate(now);
        Ok(book.campaign.clone())
    })?;

    tracing::info!(admin_id = %admin.admin_id, campaign_id = %id, "Campaign deactivated");
    Ok(Json(campaign))
}

/// Reservation filter.
#[derive(Debug, Deserialize)]
pub struct ReservationQuery {
    /// Only reservations in this status.
    pub status: Option<ReservationStatus>,
}

/// List a campaign's reservations.
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
    Query(query): Query<ReservationQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let id = campaign_id(&id)?;
    let book = state
        .store
        .get_campaign(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Campaign {id} not found")))?;

    Ok(Json(
        book.reservations_with_status(query.status)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

/// Cleanup response.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    /// Reservations expired.
    pub expired: usize,
}

/// Expire stale reservations in one campaign.
pub async fn cleanup_campaign(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let id = campaign_id(&id)?;
    let now = Utc::now();
    let grace = state.reservation_policy().grace;
    let expired = state
        .store
        .update_campaign(&id, |book| Ok(book.sweep_expired(now, grace)))?;

    tracing::info!(admin_id = %admin.admin_id, campaign_id = %id, expired, "Campaign cleanup");
    Ok(Json(CleanupResponse { expired }))
}

/// Expire stale reservations in every campaign.
pub async fn cleanup_all_campaigns(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<CleanupResponse>, ApiError> {
    let grace = state.reservation_policy().grace;
    let expired = jobs::sweep_reservations(state.store.as_ref(), grace, Utc::now())?;

    tracing::info!(admin_id = %admin.admin_id, expired, "Cleanup across campaigns");
    Ok(Json(CleanupResponse { expired }))
}

/// Manual completion request.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    /// On-chain transaction hash.
    pub transaction_hash: String,
}

/// Mark a reservation paid.
pub async fn complete_reservation(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let id: ReservationId = parse_id(&id, "reservation id")?;
    let campaign_id = state
        .store
        .campaign_for_reservation(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Reservation {id} not found")))?;
    let now = Utc::now();

    let reservation = state.store.update_campaign(&campaign_id, |book| {
        book.complete(id, body.transaction_hash, now)
    })?;

    tracing::info!(
        admin_id = %admin.admin_id,
        campaign_id = %campaign_id,
        reservation_id = %id,
        "Reservation completed manually"
    );
    Ok(Json(reservation))
}

// ============================================================================
// Tenure
// ============================================================================

/// Re-rate slotted Meks after the base rate or buffs change.
fn rerate_slotted(state: &AppState) -> Result<usize, ApiError> {
    let settings = state.store.get_tenure_settings()?;
    let buffs = state.store.list_buffs()?;
    let now = Utc::now();
    let rerated = state.store.rerate_slotted_meks(settings.cap, now, |mek| {
        effective_rate(&settings, &buffs, mek.mek_number, now)
    })?;
    tracing::debug!(rerated, "Re-rated slotted Meks");
    Ok(rerated)
}

/// Get the tenure settings.
pub async fn get_tenure_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<TenureSettings>, ApiError> {
    Ok(Json(state.store.get_tenure_settings()?))
}

/// Replace the tenure settings.
pub async fn put_tenure_settings(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(settings): Json<TenureSettings>,
) -> Result<Json<TenureSettings>, ApiError> {
    if settings.level_thresholds.keys().any(|&level| level < 2) {
        return Err(ApiError::BadRequest(
            "level thresholds start at level 2".into(),
        ));
    }
    state.store.put_tenure_settings(&settings)?;
    rerate_slotted(&state)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        base_rate = settings.base_rate_per_hour,
        levels = settings.level_thresholds.len(),
        "Tenure settings updated"
    );
    Ok(Json(settings))
}

/// List tenure buffs.
pub async fn list_buffs(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<Vec<TenureBuff>>, ApiError> {
    Ok(Json(state.store.list_buffs()?))
}

/// Buff creation request.
#[derive(Debug, Deserialize)]
pub struct CreateBuffRequest {
    /// Global or per-Mek.
    pub scope: BuffScope,
    /// Bonus in basis points.
    pub bonus_bps: u32,
    /// Optional end time.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Add a tenure buff and re-rate slotted Meks.
pub async fn create_buff(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<CreateBuffRequest>,
) -> Result<Json<TenureBuff>, ApiError> {
    if body.bonus_bps == 0 {
        return Err(ApiError::BadRequest("bonus_bps must be positive".into()));
    }
    let buff = TenureBuff {
        id: BuffId::generate(),
        scope: body.scope,
        bonus_bps: body.bonus_bps,
        active: true,
        expires_at: body.expires_at,
        created_at: Utc::now(),
    };
    state.store.put_buff(&buff)?;
    rerate_slotted(&state)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        buff_id = %buff.id,
        bonus_bps = buff.bonus_bps,
        "Tenure buff created"
    );
    Ok(Json(buff))
}

/// Deletion response.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    /// Whether something was deleted.
    pub deleted: bool,
}

/// Remove a tenure buff and re-rate slotted Meks.
pub async fn delete_buff(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id: BuffId = parse_id(&id, "buff id")?;
    state.store.delete_buff(&id)?;
    rerate_slotted(&state)?;

    tracing::info!(admin_id = %admin.admin_id, buff_id = %id, "Tenure buff deleted");
    Ok(Json(DeletedResponse { deleted: true }))
}

// ============================================================================
// Gold rate curve
// ============================================================================

/// Get the gold rate curve (the default when none is stored).
pub async fn get_gold_rate_curve(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<GoldRateCurve>, ApiError> {
    Ok(Json(state.store.get_gold_rate_curve()?.unwrap_or_default()))
}

/// Replace the gold rate curve. Applies from each account's next verification.
pub async fn put_gold_rate_curve(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(curve): Json<GoldRateCurve>,
) -> Result<Json<GoldRateCurve>, ApiError> {
    curve.validate().map_err(ApiError::BadRequest)?;
    state.store.put_gold_rate_curve(&curve)?;

    tracing::info!(admin_id = %admin.admin_id, curve = ?curve.curve_type, "Gold rate curve updated");
    Ok(Json(curve))
}

// ============================================================================
// Leaderboard
// ============================================================================

/// Refresh response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Rows written per category.
    pub categories: Vec<RefreshedCategory>,
}

/// Recompute the leaderboard now.
pub async fn refresh_leaderboard(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<RefreshResponse>, ApiError> {
    let categories = jobs::refresh_leaderboard(state.store.as_ref(), state.gold_cap(), Utc::now())?;

    tracing::info!(admin_id = %admin.admin_id, "Leaderboard refreshed by admin");
    Ok(Json(RefreshResponse { categories }))
}

/// Clear response.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Rows removed.
    pub removed: usize,
}

/// Drop the cached leaderboard.
pub async fn clear_leaderboard(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.store.clear_leaderboard()?;

    tracing::warn!(admin_id = %admin.admin_id, removed, "Leaderboard cleared");
    Ok(Json(ClearResponse { removed }))
}

// ============================================================================
// Accounts
// ============================================================================

/// Account cleanup response.
#[derive(Debug, Serialize)]
pub struct AccountCleanupResponse {
    /// Accounts deleted.
    pub deleted: usize,
    /// Wallets deleted, when known.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wallets: Vec<String>,
}

/// Delete accounts whose wallet is not a valid stake address.
pub async fn delete_mock_accounts(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<AccountCleanupResponse>, ApiError> {
    let deleted = state.store.delete_invalid_wallet_accounts()?;

    tracing::warn!(admin_id = %admin.admin_id, deleted, "Deleted mock accounts");
    Ok(Json(AccountCleanupResponse {
        deleted,
        wallets: Vec::new(),
    }))
}

/// Delete accounts that own no Meks.
pub async fn delete_zero_mek_accounts(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<AccountCleanupResponse>, ApiError> {
    let wallets = state.store.delete_zero_mek_accounts()?;

    tracing::warn!(admin_id = %admin.admin_id, deleted = wallets.len(), "Deleted zero-Mek accounts");
    Ok(Json(AccountCleanupResponse {
        deleted: wallets.len(),
        wallets: wallets.iter().map(ToString::to_string).collect(),
    }))
}

/// Clear an account's verification flag so it stops accruing.
pub async fn reset_verification(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(wallet): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let wallet: StakeAddress = parse_id(&wallet, "stake address")?;
    let now = Utc::now();
    let cap = state.gold_cap();

    let account = state.store.update_account(&wallet, |account| {
        account.reset_verification(now, cap);
        Ok(account.clone())
    })?;

    tracing::info!(admin_id = %admin.admin_id, wallet = %wallet.short(), "Verification reset");
    Ok(Json(AccountResponse::new(&account, now, cap)))
}
