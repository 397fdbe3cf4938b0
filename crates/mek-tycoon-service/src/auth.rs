//! Authentication extractors and session tokens.
//!
//! This module provides extractors for:
//! - `AuthWallet` - Player authentication via a session JWT
//! - `ServiceAuth` - Service-to-service authentication via API key
//! - `AdminAuth` - Admin authentication for privileged endpoints
//!
//! Session tokens are HS256 JWTs issued after a wallet signs a nonce
//! (see `handlers::auth`). The subject is the stake address.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{StakeAddress, SESSION_TTL_SECONDS};

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Issuer claim of session tokens.
pub const SESSION_ISSUER: &str = "mek-tycoon";

/// A player authenticated by a session token.
#[derive(Debug, Clone)]
pub struct AuthWallet {
    /// The wallet the session was issued to.
    pub wallet: StakeAddress,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthWallet {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = validate_session(token, &state.config.session_secret)?;
        let wallet = claims
            .sub
            .parse::<StakeAddress>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthWallet { wallet })
    }
}

/// Service authentication via API key.
///
/// Used by the payment provider webhook.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .service_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(api_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let service_name = parts
            .headers
            .get("x-service-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(ServiceAuth { service_name })
    }
}

/// Admin authentication via API key.
///
/// Requires the `X-Admin-Key` header to match the configured admin key.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(admin_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(AdminAuth { admin_id })
    }
}

/// JWT claims of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (stake address).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    pub iat: i64,
}

/// A freshly issued session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Issue a session token for `wallet`.
///
/// # Errors
///
/// Returns `ApiError::Internal` if the token cannot be encoded.
pub fn issue_session(
    secret: &str,
    wallet: &StakeAddress,
    now: DateTime<Utc>,
) -> Result<Session, ApiError> {
    let expires_at = now + Duration::seconds(SESSION_TTL_SECONDS);
    let claims = SessionClaims {
        sub: wallet.to_string(),
        iss: SESSION_ISSUER.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to encode session: {e}")))?;

    Ok(Session {
        token,
        expires_at: Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at),
    })
}

/// Validate a session token and return its claims.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` for a bad signature, issuer or expiry.
pub fn validate_session(token: &str, secret: &str) -> Result<SessionClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Session validation failed");
        ApiError::Unauthorized
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-session-secret";

    fn wallet() -> StakeAddress {
        "stake1u8pcjgmx7962w6hey5hhsd502araxp26kdtgagakhaqtq8squng76"
            .parse()
            .unwrap()
    }

    #[test]
    fn session_roundtrip() {
        let now = Utc::now();
        let session = issue_session(SECRET, &wallet(), now).unwrap();
        let claims = validate_session(&session.token, SECRET).unwrap();
        assert_eq!(claims.sub, wallet().to_string());
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECONDS);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let session = issue_session(SECRET, &wallet(), Utc::now()).unwrap();
        assert!(matches!(
            validate_session(&session.token, "other-secret"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let long_ago = Utc::now() - Duration::days(2);
        let session = issue_session(SECRET, &wallet(), long_ago).unwrap();
        assert!(validate_session(&session.token, SECRET).is_err());
    }
}
