//! Background jobs.
//!
//! - Leaderboard refresh: full recompute of every category, then replace.
//! - Cleanup: expire stale reservations and purge used or expired nonces.
//! - Essence checkpoint: settle every active essence wallet once a day.
//!
//! Each job runs on its own `tokio::time::interval`; the store work itself is
//! synchronous and runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time;

use mek_tycoon_core::{
    compute_rankings, AccrualCap, LeaderboardCategory, ReservationStatus,
};
use mek_tycoon_store::{AuthPurge, Store, StoreError};

use crate::state::AppState;

/// Rows written per category by a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RefreshedCategory {
    /// Category ranked.
    pub category: LeaderboardCategory,
    /// Ranked accounts.
    pub entries: usize,
}

/// Recompute every leaderboard category from the live account table.
///
/// # Errors
///
/// Returns a store error if reading accounts or writing a snapshot fails.
pub fn refresh_leaderboard<S: Store>(
    store: &S,
    cap: AccrualCap,
    now: DateTime<Utc>,
) -> Result<Vec<RefreshedCategory>, StoreError> {
    let accounts = store.list_accounts()?;
    let mut refreshed = Vec::with_capacity(LeaderboardCategory::ALL.len());

    for category in LeaderboardCategory::ALL {
        let entries = compute_rankings(&accounts, category, now, cap);
        store.replace_leaderboard(category, &entries)?;
        refreshed.push(RefreshedCategory {
            category,
            entries: entries.len(),
        });
    }

    tracing::info!(accounts = accounts.len(), "Leaderboard refreshed");
    Ok(refreshed)
}

/// Expire reservations that ran out more than `grace` ago, across all campaigns.
///
/// # Errors
///
/// Returns a store error if a campaign cannot be read or written.
pub fn sweep_reservations<S: Store>(
    store: &S,
    grace: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let cutoff = now - grace;
    let mut expired = 0;

    for book in store.list_campaigns()? {
        let stale = book
            .reservations
            .iter()
            .any(|r| r.status == ReservationStatus::Active && r.expires_at < cutoff);
        if !stale {
            continue;
        }
        let id = book.campaign.id;
        let swept = store.update_campaign(&id, |book| Ok(book.sweep_expired(now, grace)))?;
        if swept > 0 {
            tracing::info!(campaign_id = %id, swept, "Expired stale reservations");
        }
        expired += swept;
    }

    Ok(expired)
}

/// One cleanup pass: reservations then auth records.
///
/// # Errors
///
/// Returns the first store error.
pub fn run_cleanup<S: Store>(
    store: &S,
    grace: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<(usize, AuthPurge), StoreError> {
    let expired = sweep_reservations(store, grace, now)?;
    let purged = store.purge_auth_records(now)?;
    if purged.nonces > 0 || purged.attempts > 0 {
        tracing::debug!(
            nonces = purged.nonces,
            attempts = purged.attempts,
            "Purged auth records"
        );
    }
    Ok((expired, purged))
}

/// Settle every active essence wallet under the current configuration.
///
/// # Errors
///
/// Returns a store error if the configuration or a wallet cannot be read or written.
pub fn essence_checkpoint<S: Store>(store: &S, now: DateTime<Utc>) -> Result<usize, StoreError> {
    let config = store.get_essence_config()?;
    let updated = store.checkpoint_essence(&config, now)?;
    tracing::info!(wallets = updated, "Essence checkpoint completed");
    Ok(updated)
}

/// Start the background jobs.
pub fn spawn(state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let refresh_state = state.clone();
    let refresh = tokio::spawn(async move {
        let period = Duration::from_secs(refresh_state.config.leaderboard_refresh_seconds.max(1));
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            let store = refresh_state.store.clone();
            let cap = refresh_state.gold_cap();
            let result =
                tokio::task::spawn_blocking(move || refresh_leaderboard(store.as_ref(), cap, Utc::now()))
                    .await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Leaderboard refresh failed"),
                Err(e) => tracing::error!(error = %e, "Leaderboard refresh task panicked"),
            }
        }
    });

    let cleanup_state = state.clone();
    let cleanup = tokio::spawn(async move {
        let period = Duration::from_secs(cleanup_state.config.cleanup_interval_seconds.max(1));
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            let store = cleanup_state.store.clone();
            let grace = cleanup_state.reservation_policy().grace;
            let result =
                tokio::task::spawn_blocking(move || run_cleanup(store.as_ref(), grace, Utc::now()))
                    .await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Cleanup failed"),
                Err(e) => tracing::error!(error = %e, "Cleanup task panicked"),
            }
        }
    });

    let essence_state = state;
    let essence = tokio::spawn(async move {
        let period = Duration::from_secs(essence_state.config.essence_checkpoint_seconds.max(1));
        let mut interval = time::interval(period);
        // The first tick fires at once; skip it so a restart does not checkpoint early.
        interval.tick().await;
        loop {
            interval.tick().await;
            let store = essence_state.store.clone();
            let result =
                tokio::task::spawn_blocking(move || essence_checkpoint(store.as_ref(), Utc::now())).await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Essence checkpoint failed"),
                Err(e) => tracing::error!(error = %e, "Essence checkpoint task panicked"),
            }
        }
    });

    tracing::info!("Background jobs started");
    vec![refresh, cleanup, essence]
}
