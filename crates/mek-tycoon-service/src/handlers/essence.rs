//! Essence handlers.
//!
//! Player endpoints act on the caller's own essence state. The admin
//! endpoints at the bottom require [`AdminAuth`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{
    EssenceBuff, EssenceConfig, EssenceConfigUpdate, EssenceSlot, EssenceState, MekNumber,
    MekRecord, StakeAddress,
};
use mek_tycoon_store::Store;

use super::parse_id;
use crate::auth::{AdminAuth, AuthWallet};
use crate::error::ApiError;
use crate::jobs;
use crate::state::AppState;

/// Essence state valued at request time.
#[derive(Debug, Serialize)]
pub struct EssenceResponse {
    /// Wallet stake address.
    pub wallet: String,
    /// Slots in order.
    pub slots: Vec<EssenceSlot>,
    /// Balances including what accrued since the last settlement, hundredths.
    pub balances: BTreeMap<String, u64>,
    /// Accrual per variation, hundredths per day.
    pub daily_rates: BTreeMap<String, u64>,
    /// Cap per accruing variation, hundredths.
    pub caps: BTreeMap<String, u64>,
    /// Active buffs by variation.
    pub buffs: BTreeMap<String, EssenceBuff>,
    /// Gold the next swap costs, hundredths.
    pub next_swap_cost: u64,
    /// Swaps performed.
    pub total_swap_count: u32,
    /// Last daily checkpoint.
    pub last_checkpoint: DateTime<Utc>,
}

impl EssenceResponse {
    fn new(state: &EssenceState, config: &EssenceConfig, now: DateTime<Utc>) -> Self {
        let daily_rates = state.daily_rates(config);
        let caps = daily_rates
            .keys()
            .map(|variation| (variation.clone(), state.cap_for(variation, config)))
            .collect();
        Self {
            wallet: state.wallet.to_string(),
            slots: state.slots.clone(),
            balances: state.balances_at(config, now),
            daily_rates,
            caps,
            buffs: state.buffs.clone(),
            next_swap_cost: state.next_swap_cost(config),
            total_swap_count: state.total_swap_count,
            last_checkpoint: state.last_checkpoint,
        }
    }
}

fn slot_number(raw: &str) -> Result<u8, ApiError> {
    parse_id(raw, "slot number")
}

fn owned_record<S: Store>(store: &S, number: MekNumber) -> Result<MekRecord, ApiError> {
    store
        .get_mek(number)?
        .ok_or_else(|| ApiError::NotFound(format!("Mek {number} not found")))
}

/// Get the caller's essence state.
pub async fn get_essence(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<EssenceResponse>, ApiError> {
    if state.store.get_account(&auth.wallet)?.is_none() {
        return Err(ApiError::NotFound("Account not found".into()));
    }
    let config = state.store.get_essence_config()?;
    let now = Utc::now();
    let essence = state
        .store
        .get_essence_state(&auth.wallet)?
        .unwrap_or_else(|| EssenceState::new(auth.wallet.clone(), &config, now));

    Ok(Json(EssenceResponse::new(&essence, &config, now)))
}

/// Mek selection for slot and swap.
#[derive(Debug, Deserialize)]
pub struct SlotEssenceRequest {
    /// Mek to place.
    pub mek_number: MekNumber,
}

/// Put a Mek into an essence slot.
pub async fn slot_mek(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(slot): Path<String>,
    Json(body): Json<SlotEssenceRequest>,
) -> Result<Json<EssenceResponse>, ApiError> {
    let slot = slot_number(&slot)?;
    let mek = owned_record(state.store.as_ref(), body.mek_number)?;
    let config = state.store.get_essence_config()?;
    let now = Utc::now();

    let essence = state
        .store
        .update_essence(&auth.wallet, &config, now, |essence, _account| {
            essence.slot(&auth.wallet, slot, &mek, &config, now)?;
            Ok(essence.clone())
        })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        slot,
        mek = %body.mek_number,
        "Mek slotted for essence"
    );
    Ok(Json(EssenceResponse::new(&essence, &config, now)))
}

/// Empty an essence slot.
pub async fn unslot_mek(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(slot): Path<String>,
) -> Result<Json<EssenceResponse>, ApiError> {
    let slot = slot_number(&slot)?;
    let config = state.store.get_essence_config()?;
    let now = Utc::now();

    let (essence, removed) = state
        .store
        .update_essence(&auth.wallet, &config, now, |essence, _account| {
            let removed = essence.unslot(slot, &config, now)?;
            Ok((essence.clone(), removed))
        })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        slot,
        mek = %removed.mek_number,
        "Mek unslotted from essence"
    );
    Ok(Json(EssenceResponse::new(&essence, &config, now)))
}

/// Swap response.
#[derive(Debug, Serialize)]
pub struct SwapResponse {
    /// Gold paid for this swap, hundredths.
    pub gold_spent: u64,
    /// Account gold after the swap, hundredths.
    pub accumulated_gold: u64,
    /// The updated state.
    pub essence: EssenceResponse,
}

/// Replace the Mek in an occupied slot, paying the swap cost.
pub async fn swap_mek(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(slot): Path<String>,
    Json(body): Json<SlotEssenceRequest>,
) -> Result<Json<SwapResponse>, ApiError> {
    let slot = slot_number(&slot)?;
    let mek = owned_record(state.store.as_ref(), body.mek_number)?;
    let config = state.store.get_essence_config()?;
    let gold_cap = state.gold_cap();
    let now = Utc::now();

    let (essence, gold_spent, accumulated_gold) =
        state
            .store
            .update_essence(&auth.wallet, &config, now, |essence, account| {
                let cost = essence.swap(&auth.wallet, slot, &mek, account, &config, gold_cap, now)?;
                Ok((essence.clone(), cost, account.accumulated_gold))
            })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        slot,
        mek = %body.mek_number,
        gold_spent,
        "Essence slot swapped"
    );
    Ok(Json(SwapResponse {
        gold_spent,
        accumulated_gold,
        essence: EssenceResponse::new(&essence, &config, now),
    }))
}

/// Unlock an essence slot, paying its gold and essence price.
pub async fn unlock_slot(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Path(slot): Path<String>,
) -> Result<Json<EssenceResponse>, ApiError> {
    let slot = slot_number(&slot)?;
    let config = state.store.get_essence_config()?;
    let gold_cap = state.gold_cap();
    let now = Utc::now();

    let essence = state
        .store
        .update_essence(&auth.wallet, &config, now, |essence, account| {
            essence.unlock_slot(slot, account, &config, gold_cap, now)?;
            Ok(essence.clone())
        })?;

    tracing::info!(wallet = %auth.wallet.short(), slot, "Essence slot unlocked");
    Ok(Json(EssenceResponse::new(&essence, &config, now)))
}

// ============================================================================
// Admin
// ============================================================================

/// Get the essence configuration.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<EssenceConfig>, ApiError> {
    Ok(Json(state.store.get_essence_config()?))
}

/// Merge a partial update into the essence configuration.
pub async fn put_config(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(update): Json<EssenceConfigUpdate>,
) -> Result<Json<EssenceConfig>, ApiError> {
    let config = update.apply(&state.store.get_essence_config()?)?;
    state.store.put_essence_config(&config)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        rate_per_day = config.rate_per_day,
        cap = config.cap,
        "Essence config updated"
    );
    Ok(Json(config))
}

/// Essence grant request.
#[derive(Debug, Deserialize)]
pub struct AddEssenceRequest {
    /// Variation key, e.g. `head:aa1`.
    pub variation: String,
    /// Amount, hundredths.
    pub amount: u64,
}

/// Essence grant response.
#[derive(Debug, Serialize)]
pub struct AddEssenceResponse {
    /// Variation credited.
    pub variation: String,
    /// Settled balance after the grant, hundredths.
    pub balance: u64,
}

/// Grant essence to a wallet.
pub async fn add_essence(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(wallet): Path<String>,
    Json(body): Json<AddEssenceRequest>,
) -> Result<Json<AddEssenceResponse>, ApiError> {
    let wallet: StakeAddress = parse_id(&wallet, "stake address")?;
    let config = state.store.get_essence_config()?;
    let now = Utc::now();

    let balance = state
        .store
        .update_essence(&wallet, &config, now, |essence, _account| {
            essence.add_essence(&body.variation, body.amount, &config, now)
        })?;

    tracing::info!(
        admin_id = %admin.admin_id,
        wallet = %wallet.short(),
        variation = %body.variation,
        amount = body.amount,
        "Essence granted"
    );
    Ok(Json(AddEssenceResponse {
        variation: body.variation.trim().to_string(),
        balance,
    }))
}

/// Buff request.
#[derive(Debug, Deserialize)]
pub struct SetBuffRequest {
    /// Variation key.
    pub variation: String,
    /// Rate multiplier in basis points. 10000 is neutral.
    pub rate_multiplier_bps: u32,
    /// Extra cap, hundredths.
    #[serde(default)]
    pub cap_bonus: u64,
}

/// Set or clear a wallet's buff for one variation.
pub async fn set_buff(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(wallet): Path<String>,
    Json(body): Json<SetBuffRequest>,
) -> Result<Json<EssenceResponse>, ApiError> {
    let wallet: StakeAddress = parse_id(&wallet, "stake address")?;
    let variation = body.variation.trim();
    if variation.is_empty() {
        return Err(ApiError::BadRequest("variation must not be empty".into()));
    }
    let buff = EssenceBuff {
        rate_multiplier_bps: body.rate_multiplier_bps,
        cap_bonus: body.cap_bonus,
    };
    let config = state.store.get_essence_config()?;
    let now = Utc::now();

    let essence = state
        .store
        .update_essence(&wallet, &config, now, |essence, _account| {
            essence.set_buff(variation, buff, &config, now);
            Ok(essence.clone())
        })?;

    tracing::info!(
        admin_id = %admin.admin_id,
        wallet = %wallet.short(),
        variation,
        rate_multiplier_bps = buff.rate_multiplier_bps,
        cap_bonus = buff.cap_bonus,
        "Essence buff set"
    );
    Ok(Json(EssenceResponse::new(&essence, &config, now)))
}

/// Checkpoint response.
#[derive(Debug, Serialize)]
pub struct EssenceCheckpointResponse {
    /// Wallets settled.
    pub wallets: usize,
}

/// Run the daily essence checkpoint now.
pub async fn checkpoint(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
) -> Result<Json<EssenceCheckpointResponse>, ApiError> {
    let wallets = jobs::essence_checkpoint(state.store.as_ref(), Utc::now())?;

    tracing::info!(admin_id = %admin.admin_id, wallets, "Essence checkpoint run by admin");
    Ok(Json(EssenceCheckpointResponse { wallets }))
}
