//! Gold accrual handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{format_units, AccrualCap, Checkpoint, MinerAccount, CHECKPOINT_DEBOUNCE_SECONDS};
use mek_tycoon_store::Store;

use crate::auth::AuthWallet;
use crate::error::ApiError;
use crate::state::AppState;

/// Gold balance at a point in time.
#[derive(Debug, Serialize)]
pub struct GoldResponse {
    /// Settled gold, hundredths.
    pub accumulated_gold: u64,
    /// Gold earned since the last settlement, after the cap.
    pub pending_gold: u64,
    /// Settled plus pending.
    pub current_gold: u64,
    /// Current gold formatted with two decimals.
    pub current_gold_formatted: String,
    /// Cumulative gold including pending.
    pub total_cumulative_gold: u64,
    /// Gold rate, hundredths per hour.
    pub gold_per_hour: u64,
    /// Whether the account accrues.
    pub is_blockchain_verified: bool,
    /// Accrual window in hours, `None` when unlimited.
    pub cap_hours: Option<u32>,
    /// Last settlement.
    pub last_gold_collection: DateTime<Utc>,
    /// When the figures were computed.
    pub as_of: DateTime<Utc>,
}

impl GoldResponse {
    fn new(account: &MinerAccount, now: DateTime<Utc>, cap: AccrualCap) -> Self {
        let current_gold = account.current_gold(now, cap);
        Self {
            accumulated_gold: account.accumulated_gold,
            pending_gold: account.pending_gold(now, cap),
            current_gold,
            current_gold_formatted: format_units(current_gold),
            total_cumulative_gold: account.cumulative_gold(now, cap),
            gold_per_hour: account.gold_per_hour,
            is_blockchain_verified: account.is_blockchain_verified,
            cap_hours: match cap {
                AccrualCap::Unlimited => None,
                AccrualCap::Hours(hours) => Some(hours),
            },
            last_gold_collection: account.last_gold_collection,
            as_of: now,
        }
    }
}

/// Get the caller's gold.
pub async fn get_gold(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<GoldResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.wallet)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(GoldResponse::new(&account, Utc::now(), state.gold_cap())))
}

/// Collect response.
#[derive(Debug, Serialize)]
pub struct CollectResponse {
    /// Gold settled by this call.
    pub collected: u64,
    /// Balance after collecting.
    pub gold: GoldResponse,
}

/// Settle pending gold.
pub async fn collect(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<CollectResponse>, ApiError> {
    let now = Utc::now();
    let cap = state.gold_cap();
    let (collected, account) = state.store.update_account(&auth.wallet, |account| {
        let collected = account.collect(now, cap);
        Ok((collected, account.clone()))
    })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        collected,
        total = account.accumulated_gold,
        "Gold collected"
    );

    Ok(Json(CollectResponse {
        collected,
        gold: GoldResponse::new(&account, now, cap),
    }))
}

/// Checkpoint response.
#[derive(Debug, Serialize)]
pub struct CheckpointResponse {
    /// Whether the checkpoint was saved or skipped.
    pub checkpoint: Checkpoint,
    /// Balance after the checkpoint.
    pub gold: GoldResponse,
}

/// Settle pending gold unless the account was written very recently.
pub async fn checkpoint(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<CheckpointResponse>, ApiError> {
    let now = Utc::now();
    let cap = state.gold_cap();
    let debounce = Duration::seconds(CHECKPOINT_DEBOUNCE_SECONDS);
    let (checkpoint, account) = state.store.update_account(&auth.wallet, |account| {
        let checkpoint = account.checkpoint(now, cap, debounce);
        Ok((checkpoint, account.clone()))
    })?;

    tracing::debug!(wallet = %auth.wallet.short(), ?checkpoint, "Gold checkpoint");

    Ok(Json(CheckpointResponse {
        checkpoint,
        gold: GoldResponse::new(&account, now, cap),
    }))
}

/// Spend request.
#[derive(Debug, Deserialize)]
pub struct SpendRequest {
    /// Amount in hundredths.
    pub amount: u64,
    /// What the gold is spent on, for the log.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Spend response.
#[derive(Debug, Serialize)]
pub struct SpendResponse {
    /// Amount removed.
    pub spent: u64,
    /// Balance after spending.
    pub gold: GoldResponse,
}

/// Spend settled gold.
pub async fn spend(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Json(body): Json<SpendRequest>,
) -> Result<Json<SpendResponse>, ApiError> {
    let now = Utc::now();
    let cap = state.gold_cap();
    let account = state.store.update_account(&auth.wallet, |account| {
        account.spend_gold(body.amount, now, cap)?;
        Ok(account.clone())
    })?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        amount = body.amount,
        reason = body.reason.as_deref().unwrap_or("unspecified"),
        remaining = account.accumulated_gold,
        "Gold spent"
    );

    Ok(Json(SpendResponse {
        spent: body.amount,
        gold: GoldResponse::new(&account, now, cap),
    }))
}
