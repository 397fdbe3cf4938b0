//! Leaderboard handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use mek_tycoon_core::leaderboard::clamp_limit;
use mek_tycoon_core::{LeaderboardCategory, LeaderboardEntry};
use mek_tycoon_store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// Leaderboard query parameters.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Rows to return (default 10, max 100).
    pub limit: Option<usize>,
}

/// Leaderboard response.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    /// Category ranked.
    pub category: LeaderboardCategory,
    /// Top rows, best first.
    pub entries: Vec<LeaderboardEntry>,
}

/// Read the cached top N for a category.
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let category: LeaderboardCategory = category.parse().map_err(ApiError::BadRequest)?;
    let entries = state
        .store
        .get_leaderboard(category, clamp_limit(query.limit))?;

    Ok(Json(LeaderboardResponse { category, entries }))
}
