//! API handlers.

use std::str::FromStr;

use crate::error::ApiError;

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod campaigns;
pub mod essence;
pub mod gold;
pub mod health;
pub mod leaderboard;
pub mod meks;
pub mod webhooks;

/// Parse a path segment, rejecting bad ids with a JSON 400.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}: {raw}")))
}
