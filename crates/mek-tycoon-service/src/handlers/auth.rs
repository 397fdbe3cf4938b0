//! Wallet sign-in handlers.
//!
//! A wallet asks for a nonce, signs the returned message with CIP-30
//! `signData`, and exchanges the signature for a session token.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use mek_tycoon_core::auth::{NONCE_ALPHABET, NONCE_LEN};
use mek_tycoon_core::{AuthAttempts, NonceChallenge, StakeAddress, TycoonError};
use mek_tycoon_store::Store;

use crate::auth::issue_session;
use crate::crypto::verify_cip30_signature;
use crate::error::ApiError;
use crate::state::AppState;

/// Nonce request.
#[derive(Debug, Deserialize)]
pub struct NonceRequest {
    /// Wallet stake address.
    pub stake_address: String,
    /// Wallet software name (e.g. "eternl").
    pub wallet_name: String,
    /// Site origin to embed in the message.
    #[serde(default)]
    pub origin: Option<String>,
}

/// Nonce response.
#[derive(Debug, Serialize)]
pub struct NonceResponse {
    /// The nonce.
    pub nonce: String,
    /// Message the wallet must sign.
    pub message: String,
    /// When the nonce expires.
    pub expires_at: DateTime<Utc>,
}

/// Signature verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Wallet stake address.
    pub stake_address: String,
    /// Nonce being redeemed.
    pub nonce: String,
    /// Hex `COSE_Sign1` from `signData`.
    pub signature: String,
    /// Hex `COSE_Key` from `signData`.
    pub key: String,
}

/// Signature verification response.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Session bearer token.
    pub token: String,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// The authenticated wallet.
    pub wallet: String,
    /// Whether this sign-in created the account.
    pub account_created: bool,
}

fn parse_wallet(raw: &str) -> Result<StakeAddress, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid stake address: {raw}")))
}

fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| char::from(NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())]))
        .collect()
}

/// Issue a nonce for a wallet, replacing any outstanding one.
pub async fn issue_nonce(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NonceRequest>,
) -> Result<Json<NonceResponse>, ApiError> {
    let wallet = parse_wallet(&body.stake_address)?;
    let now = Utc::now();

    let challenge = state.store.update_auth_state(&wallet, |auth| {
        auth.attempts.ensure_unlocked(now)?;
        let challenge = NonceChallenge::issue(
            wallet.clone(),
            generate_nonce(),
            body.wallet_name.clone(),
            body.origin.clone(),
            now,
        );
        auth.nonce = Some(challenge.clone());
        Ok(challenge)
    })?;

    tracing::info!(
        wallet = %wallet.short(),
        wallet_name = %body.wallet_name,
        "Issued sign-in nonce"
    );

    Ok(Json(NonceResponse {
        nonce: challenge.nonce,
        message: challenge.message,
        expires_at: challenge.expires_at,
    }))
}

/// Verify a signed nonce and issue a session.
pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let wallet = parse_wallet(&body.stake_address)?;
    let now = Utc::now();

    // A rejected attempt must still be recorded, so the closure reports the
    // rejection as a value and the error is raised after the write.
    let outcome = state.store.update_auth_state(&wallet, |auth| {
        auth.attempts.ensure_unlocked(now)?;

        let check = match &auth.nonce {
            None => Err(TycoonError::InvalidNonce("no outstanding nonce".to_string())),
            Some(challenge) => challenge.check(&body.nonce, now).and_then(|()| {
                verify_cip30_signature(
                    &body.signature,
                    &body.key,
                    &challenge.message,
                    wallet.as_str(),
                )
                .map_err(|e| TycoonError::InvalidSignature(e.to_string()))
            }),
        };

        match check {
            Ok(()) => {
                if let Some(challenge) = auth.nonce.as_mut() {
                    challenge.used_at = Some(now);
                }
                auth.attempts = AuthAttempts::default();
                Ok(Ok(()))
            }
            Err(e) => {
                if auth.attempts.record_failure(now) {
                    tracing::warn!(wallet = %wallet.short(), "Wallet locked out after failed sign-ins");
                }
                Ok(Err(e))
            }
        }
    })?;

    if let Err(e) = outcome {
        tracing::info!(wallet = %wallet.short(), error = %e, "Sign-in rejected");
        return Err(e.into());
    }

    let (_, account_created) = state.store.get_or_create_account(&wallet, now)?;
    let session = issue_session(&state.config.session_secret, &wallet, now)?;

    tracing::info!(wallet = %wallet.short(), account_created, "Wallet signed in");

    Ok(Json(VerifyResponse {
        token: session.token,
        expires_at: session.expires_at,
        wallet: wallet.to_string(),
        account_created,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_use_the_alphabet() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.bytes().all(|b| NONCE_ALPHABET.contains(&b)));
        assert_ne!(nonce, generate_nonce());
    }
}
