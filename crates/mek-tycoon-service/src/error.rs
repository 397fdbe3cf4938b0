//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use mek_tycoon_core::{format_units, TycoonError};
use mek_tycoon_store::StoreError;

use crate::blockfrost::BlockfrostError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Wallet sign-in failed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Forbidden - valid credentials but not allowed to act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The resource is no longer available (campaign ended or sold out).
    #[error("gone: {0}")]
    Gone(String),

    /// Not enough gold.
    #[error("insufficient gold: available={available}, required={required}")]
    InsufficientGold {
        /// Settled gold in hundredths.
        available: u64,
        /// Requested amount in hundredths.
        required: u64,
    },

    /// Not enough essence of one variation.
    #[error("insufficient {variation} essence: available={available}, required={required}")]
    InsufficientEssence {
        /// Variation key.
        variation: String,
        /// Balance in hundredths.
        available: u64,
        /// Requested amount in hundredths.
        required: u64,
    },

    /// Too many failed sign-in attempts.
    #[error("locked out for {retry_after_seconds}s")]
    LockedOut {
        /// Seconds until the lockout ends.
        retry_after_seconds: i64,
    },

    /// A required integration is not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::AuthFailed(msg) => (StatusCode::UNAUTHORIZED, "auth_failed", msg.clone(), None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::Gone(msg) => (StatusCode::GONE, "gone", msg.clone(), None),
            Self::InsufficientGold {
                available,
                required,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_gold",
                format!(
                    "Not enough gold: have {}, need {}",
                    format_units(*available),
                    format_units(*required)
                ),
                Some(serde_json::json!({
                    "available": available,
                    "required": required
                })),
            ),
            Self::InsufficientEssence {
                variation,
                available,
                required,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_essence",
                format!(
                    "Not enough {variation} essence: have {}, need {}",
                    format_units(*available),
                    format_units(*required)
                ),
                Some(serde_json::json!({
                    "variation": variation,
                    "available": available,
                    "required": required
                })),
            ),
            Self::LockedOut {
                retry_after_seconds,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "locked_out",
                "Too many failed attempts, try again later".to_string(),
                Some(serde_json::json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<TycoonError> for ApiError {
    fn from(err: TycoonError) -> Self {
        let message = err.to_string();
        match err {
            TycoonError::InsufficientGold {
                available,
                required,
            } => Self::InsufficientGold {
                available,
                required,
            },
            TycoonError::InsufficientEssence {
                variation,
                available,
                required,
            } => Self::InsufficientEssence {
                variation,
                available,
                required,
            },
            TycoonError::LockedOut {
                retry_after_seconds,
            } => Self::LockedOut {
                retry_after_seconds,
            },
            TycoonError::InvalidNonce(_) | TycoonError::InvalidSignature(_) => {
                Self::AuthFailed(message)
            }
            TycoonError::NotOwner { .. } | TycoonError::Forbidden(_) => Self::Forbidden(message),
            TycoonError::CampaignEnded { .. } | TycoonError::SoldOut { .. } => Self::Gone(message),
            TycoonError::CompanyNameTaken(_)
            | TycoonError::AlreadySlotted { .. }
            | TycoonError::NotSlotted { .. }
            | TycoonError::SlotOccupied { .. }
            | TycoonError::SlotLocked { .. }
            | TycoonError::SlotAlreadyUnlocked { .. }
            | TycoonError::SlotEmpty { .. }
            | TycoonError::LevelNotConfigured { .. }
            | TycoonError::CampaignNotActive { .. }
            | TycoonError::CampaignNotStarted { .. }
            | TycoonError::AlreadyClaimed { .. }
            | TycoonError::ReservationNotActive { .. } => Self::Conflict(message),
            TycoonError::InvalidAmount(_)
            | TycoonError::InvalidCompanyName(_)
            | TycoonError::InvalidInventory(_)
            | TycoonError::InvalidSlot { .. }
            | TycoonError::UnknownVariations { .. }
            | TycoonError::InvalidEssenceConfig(_)
            | TycoonError::InvalidId(_) => Self::BadRequest(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::Domain(err) => err.into(),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<BlockfrostError> for ApiError {
    fn from(err: BlockfrostError) -> Self {
        tracing::warn!(error = %err, "Blockfrost request failed");
        Self::ExternalService(format!("Blockfrost: {err}"))
    }
}
