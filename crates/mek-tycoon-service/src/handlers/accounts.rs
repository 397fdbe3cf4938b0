//! Account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{format_units, validate_company_name, AccrualCap, MinerAccount, OwnedMek};
use mek_tycoon_store::Store;

use crate::auth::AuthWallet;
use crate::blockfrost;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response with gold valued at request time.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Wallet stake address.
    pub wallet: String,
    /// Company name, if set.
    pub company_name: Option<String>,
    /// Leaderboard display name.
    pub display_name: String,
    /// Settled gold, hundredths.
    pub accumulated_gold: u64,
    /// Settled plus pending gold, hundredths.
    pub current_gold: u64,
    /// Current gold formatted with two decimals.
    pub current_gold_formatted: String,
    /// Cumulative gold including pending, hundredths.
    pub total_cumulative_gold: u64,
    /// Gold spent, hundredths.
    pub gold_spent: u64,
    /// Gold rate, hundredths per hour.
    pub gold_per_hour: u64,
    /// Owned Meks at the last verification.
    pub owned_meks: Vec<OwnedMek>,
    /// Whether ownership is verified on chain.
    pub is_blockchain_verified: bool,
    /// Last settlement.
    pub last_gold_collection: DateTime<Utc>,
    /// Last player action.
    pub last_active_time: DateTime<Utc>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Write counter.
    pub version: u64,
}

impl AccountResponse {
    /// Build a response valuing pending gold at `now`.
    #[must_use]
    pub fn new(account: &MinerAccount, now: DateTime<Utc>, cap: AccrualCap) -> Self {
        let current_gold = account.current_gold(now, cap);
        Self {
            wallet: account.wallet.to_string(),
            company_name: account.company_name.clone(),
            display_name: account.display_name(),
            accumulated_gold: account.accumulated_gold,
            current_gold,
            current_gold_formatted: format_units(current_gold),
            total_cumulative_gold: account.cumulative_gold(now, cap),
            gold_spent: account.gold_spent,
            gold_per_hour: account.gold_per_hour,
            owned_meks: account.owned_meks.clone(),
            is_blockchain_verified: account.is_blockchain_verified,
            last_gold_collection: account.last_gold_collection,
            last_active_time: account.last_active_time,
            created_at: account.created_at,
            version: account.version,
        }
    }
}

/// Connect response.
#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    /// Whether this connect created the account.
    pub created: bool,
    /// The account.
    pub account: AccountResponse,
}

/// Connect a wallet, creating its account on first connect.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<ConnectResponse>, ApiError> {
    let now = Utc::now();
    let (account, created) = state.store.get_or_create_account(&auth.wallet, now)?;

    let account = if created {
        account
    } else {
        state.store.update_account(&auth.wallet, |account| {
            account.mark_active(now);
            Ok(account.clone())
        })?
    };

    tracing::debug!(wallet = %auth.wallet.short(), created, "Wallet connected");

    Ok(Json(ConnectResponse {
        created,
        account: AccountResponse::new(&account, now, state.gold_cap()),
    }))
}

/// Get the caller's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.wallet)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::new(&account, Utc::now(), state.gold_cap())))
}

/// Company name request.
#[derive(Debug, Deserialize)]
pub struct CompanyNameRequest {
    /// Requested name.
    pub company_name: String,
}

/// Set the caller's company name.
pub async fn set_company_name(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
    Json(body): Json<CompanyNameRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let name = validate_company_name(&body.company_name)?;
    let now = Utc::now();
    let account = state.store.set_company_name(&auth.wallet, &name, now)?;

    tracing::info!(wallet = %auth.wallet.short(), company_name = %name, "Company name set");

    Ok(Json(AccountResponse::new(&account, now, state.gold_cap())))
}

/// Verification response.
#[derive(Debug, Serialize)]
pub struct VerifyOwnershipResponse {
    /// Meks found on chain.
    pub mek_count: usize,
    /// Assets scanned.
    pub total_assets: usize,
    /// The updated account.
    pub account: AccountResponse,
}

/// Verify on-chain Mek ownership and install the snapshot.
pub async fn verify_ownership(
    State(state): State<Arc<AppState>>,
    auth: AuthWallet,
) -> Result<Json<VerifyOwnershipResponse>, ApiError> {
    let client = state
        .blockfrost
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Blockchain verification is not configured".into()))?;

    if state.store.get_account(&auth.wallet)?.is_none() {
        return Err(ApiError::NotFound("Account not found".into()));
    }

    let assets = client.account_assets(&auth.wallet).await?;
    let curve = state.store.get_gold_rate_curve()?;
    let meks = blockfrost::owned_meks(&assets, &state.config.mek_policy_id, curve.as_ref());
    let mek_count = meks.len();

    let tenure = state.store.get_tenure_settings()?;
    let now = Utc::now();
    let account =
        state
            .store
            .apply_verification(&auth.wallet, meks, state.gold_cap(), tenure.cap, now)?;

    tracing::info!(
        wallet = %auth.wallet.short(),
        mek_count,
        gold_per_hour = account.gold_per_hour,
        "Ownership verified"
    );

    Ok(Json(VerifyOwnershipResponse {
        mek_count,
        total_assets: assets.len(),
        account: AccountResponse::new(&account, now, state.gold_cap()),
    }))
}
