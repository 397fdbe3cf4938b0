//! Mek slotting and tenure handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{
    effective_rate, LevelUpOutcome, MekNumber, MekRecord, TenureSettings, TycoonError,
    DEFAULT_MAX_LEVELS,
};
use mek_tycoon_store::Store;

use crate::auth::AuthWallet;
use crate::error::ApiError;
use crate::state::AppState;

/// A Mek with tenure valued at request time.
#[derive(Debug, Serialize)]
pub struct MekResponse {
    /// Mek number.
    pub mek_number: MekNumber,
    /// On-chain asset id.
    pub asset_id: String,
    /// Current level.
    pub level: u32,
    /// Tenure including what accrued since the last settlement.
    pub tenure: u64,
    /// Tenure rate while slotted, hundredths per hour.
    pub tenure_rate: u64,
    /// Whether the Mek is slotted.
    pub is_slotted: bool,
    /// Slot number.
    pub slot_number: Option<u8>,
    /// Tenure needed for the next level, if configured.
    pub next_level_threshold: Option<u64>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

impl MekResponse {
    fn new(mek: &MekRecord, settings: &TenureSettings, now: DateTime<Utc>) -> Self {
        Self {
            mek_number: mek.mek_number,
            asset_id: mek.asset_id.clone(),
            level: mek.level,
            tenure: mek.current_tenure(settings.cap, now),
            tenure_rate: mek.tenure_rate,
            is_slotted: mek.is_slotted,
            slot_number: mek.slot_number,
            next_level_threshold: settings.threshold_for(mek.level + 1),
            updated_at: mek.updated_at,
        }
    }
}

fn parse_mek(raw: &str) -> Result<MekNumber, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid Mek number: {raw}")))
}

fn find_mek(meks: &mut [MekRecord], number: MekNumber) -> mek_tycoon_core::Result<&mut MekRecord> {
    meks.iter_mut()
        .find(|m| m.mek_number == number)
        .ok_or(TycoonError::NotOwner { mek: number.get() })
}

/// List the caller's Meks.
pub async fn list_meks(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<Vec<MekResponse>>, ApiError> {
    let settings = state.store.get_tenure_settings()?;
    let now = Utc::now();
    let meks = state.store.list_meks_by_owner(&auth.wallet)?;

    Ok(Json(
        meks.iter()
            .map(|mek| MekResponse::new(mek, &settings, now))
            .collect(),
    ))
}

/// Slot request.
#[derive(Debug, Deserialize)]
pub struct SlotRequest {
    /// Slot to place the Mek in.
    pub slot_number: u8,
}

/// Slot a Mek so it accrues tenure.
pub async fn slot_mek(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(mek): Path<String>,
    Json(body): Json<SlotRequest>,
) -> Result<Json<MekResponse>, ApiError> {
    let number = parse_mek(&mek)?;
    let settings = state.store.get_tenure_settings()?;
    let buffs = state.store.list_buffs()?;
    let now = Utc::now();
    let rate = effective_rate(&settings, &buffs, number, now);

    let slotted = state.store.update_owner_meks(&auth.wallet, |meks| {
        if let Some(occupant) = meks
            .iter()
            .find(|m| m.is_slotted && m.slot_number == Some(body.slot_number) && m.mek_number != number)
        {
            return Err(TycoonError::SlotOccupied {
                slot: body.slot_number,
                mek: occupant.mek_number.get(),
            });
        }
        let mek = find_mek(meks, number)?;
        mek.slot(&auth.wallet, body.slot_number, rate, now)?;
        Ok(mek.clone())
    })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        mek = %number,
        slot = body.slot_number,
        tenure_rate = rate,
        "Mek slotted"
    );

    Ok(Json(MekResponse::new(&slotted, &settings, now)))
}

/// Unslot a Mek, freezing its tenure.
pub async fn unslot_mek(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(mek): Path<String>,
) -> Result<Json<MekResponse>, ApiError> {
    let number = parse_mek(&mek)?;
    let settings = state.store.get_tenure_settings()?;
    let now = Utc::now();

    let unslotted = state.store.update_owner_meks(&auth.wallet, |meks| {
        let mek = find_mek(meks, number)?;
        mek.unslot(&auth.wallet, settings.cap, now)?;
        Ok(mek.clone())
    })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        mek = %number,
        tenure = unslotted.tenure_points,
        "Mek unslotted"
    );

    Ok(Json(MekResponse::new(&unslotted, &settings, now)))
}

/// Level-up request.
#[derive(Debug, Default, Deserialize)]
pub struct LevelUpRequest {
    /// Most levels to buy in one call (default 1).
    #[serde(default)]
    pub max_levels: Option<u32>,
}

/// Level-up response.
#[derive(Debug, Serialize)]
pub struct LevelUpResponse {
    /// What happened.
    pub outcome: LevelUpOutcome,
    /// The Mek afterwards.
    pub mek: MekResponse,
}

/// Spend tenure on one or more levels.
pub async fn level_up(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(mek): Path<String>,
    body: Option<Json<LevelUpRequest>>,
) -> Result<Json<LevelUpResponse>, ApiError> {
    let number = parse_mek(&mek)?;
    let max_levels = body
        .and_then(|Json(body)| body.max_levels)
        .unwrap_or(1)
        .clamp(1, DEFAULT_MAX_LEVELS);
    let settings = state.store.get_tenure_settings()?;
    let now = Utc::now();

    let (outcome, updated) = state.store.update_owner_meks(&auth.wallet, |meks| {
        let mek = find_mek(meks, number)?;
        let outcome = mek.level_up(&auth.wallet, &settings, max_levels, now)?;
        Ok((outcome, mek.clone()))
    })?;

    if let LevelUpOutcome::LeveledUp {
        previous_level,
        new_level,
        tenure_spent,
        ..
    } = outcome
    {
        tracing::info!(
            wallet = %auth.wallet.short(),
            mek = %number,
            previous_level,
            new_level,
            tenure_spent,
            "Mek leveled up"
        );
    }

    Ok(Json(LevelUpResponse {
        outcome,
        mek: MekResponse::new(&updated, &settings, now),
    }))
}
