//! Wallet authentication records.
//!
//! A wallet proves ownership by signing a one-time nonce message. Failed
//! verifications are counted per wallet and too many inside the window lock
//! the wallet out of nonce issuance and verification.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TycoonError};
use crate::ids::StakeAddress;

/// How long a nonce may be signed.
pub const NONCE_TTL_SECONDS: i64 = 5 * 60;

/// How long a session lasts after a successful verification.
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Failures inside the window that trigger a lockout.
pub const MAX_FAILED_ATTEMPTS: usize = 10;

/// Window in which failures are counted.
pub const FAILED_ATTEMPT_WINDOW_SECONDS: i64 = 60 * 60;

/// Lockout length.
pub const LOCKOUT_SECONDS: i64 = 60 * 60;

/// Nonce length in characters.
pub const NONCE_LEN: usize = 32;

/// Characters a nonce is drawn from.
pub const NONCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// The message a wallet signs to prove ownership.
#[must_use]
pub fn signing_message(nonce: &str, issued_at: DateTime<Utc>, origin: Option<&str>) -> String {
    let origin_line = origin.map(|o| format!("\nOrigin: {o}")).unwrap_or_default();
    format!(
        "Sign this message to verify wallet ownership for Mek Tycoon.\n\n\
         Nonce: {nonce}\n\
         Timestamp: {}{origin_line}\n\n\
         This signature will not trigger any blockchain transactions or cost any ADA.",
        issued_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    )
}

/// An outstanding nonce for a wallet. Issuing a new one replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceChallenge {
    /// Wallet being challenged.
    pub stake_address: StakeAddress,
    /// The nonce.
    pub nonce: String,
    /// Exact message to sign.
    pub message: String,
    /// Wallet extension name reported by the client.
    pub wallet_name: String,
    /// Page origin reported by the client.
    pub origin: Option<String>,
    /// When it was issued.
    pub issued_at: DateTime<Utc>,
    /// When it stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Set once verified.
    pub used_at: Option<DateTime<Utc>>,
}

impl NonceChallenge {
    /// Build a challenge around a freshly generated nonce.
    #[must_use]
    pub fn issue(
        stake_address: StakeAddress,
        nonce: String,
        wallet_name: String,
        origin: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let message = signing_message(&nonce, now, origin.as_deref());
        Self {
            stake_address,
            nonce,
            message,
            wallet_name,
            origin,
            issued_at: now,
            expires_at: now + Duration::seconds(NONCE_TTL_SECONDS),
            used_at: None,
        }
    }

    /// Check that `nonce` may be redeemed now.
    ///
    /// # Errors
    ///
    /// Returns [`TycoonError::InvalidNonce`] when it differs, was used, or expired.
    pub fn check(&self, nonce: &str, now: DateTime<Utc>) -> Result<()> {
        if self.nonce != nonce {
            return Err(TycoonError::InvalidNonce("invalid or expired nonce".to_string()));
        }
        if self.used_at.is_some() {
            return Err(TycoonError::InvalidNonce("nonce already consumed".to_string()));
        }
        if now > self.expires_at {
            return Err(TycoonError::InvalidNonce("nonce expired".to_string()));
        }
        Ok(())
    }
}

/// Failed verification history for a wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAttempts {
    /// Failure times inside the counting window.
    pub failures: Vec<DateTime<Utc>>,
    /// End of the current lockout.
    pub locked_until: Option<DateTime<Utc>>,
}

impl AuthAttempts {
    /// Fail if the wallet is locked out at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TycoonError::LockedOut`] with the remaining seconds.
    pub fn ensure_unlocked(&self, now: DateTime<Utc>) -> Result<()> {
        match self.locked_until {
            Some(until) if until > now => Err(TycoonError::LockedOut {
                retry_after_seconds: (until - now).num_seconds().max(1),
            }),
            _ => Ok(()),
        }
    }

    /// Record a failure. Returns `true` if this failure started a lockout.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        let window_start = now - Duration::seconds(FAILED_ATTEMPT_WINDOW_SECONDS);
        self.failures.retain(|at| *at >= window_start);
        self.failures.push(now);
        if self.failures.len() >= MAX_FAILED_ATTEMPTS {
            self.locked_until = Some(now + Duration::seconds(LOCKOUT_SECONDS));
            return true;
        }
        false
    }

    /// Whether the record carries nothing worth keeping at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let window_start = now - Duration::seconds(FAILED_ATTEMPT_WINDOW_SECONDS);
        self.locked_until.map_or(true, |until| until <= now)
            && self.failures.iter().all(|at| *at < window_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wallet() -> StakeAddress {
        format!("stake1{}", "a".repeat(53)).parse().unwrap()
    }

    #[test]
    fn message_format() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let message = signing_message("abc", at, Some("https://mek.overexposed.io"));
        assert_eq!(
            message,
            "Sign this message to verify wallet ownership for Mek Tycoon.\n\n\
             Nonce: abc\nTimestamp: 2025-01-02T03:04:05.000Z\n\
             Origin: https://mek.overexposed.io\n\n\
             This signature will not trigger any blockchain transactions or cost any ADA."
        );
        assert!(!signing_message("abc", at, None).contains("Origin"));
    }

    #[test]
    fn nonce_checks() {
        let now = Utc::now();
        let mut challenge =
            NonceChallenge::issue(wallet(), "n1".to_string(), "eternl".to_string(), None, now);
        assert!(challenge.check("n1", now).is_ok());
        assert!(challenge.check("n2", now).is_err());
        assert!(challenge
            .check("n1", now + Duration::seconds(NONCE_TTL_SECONDS + 1))
            .is_err());
        challenge.used_at = Some(now);
        assert!(challenge.check("n1", now).is_err());
    }

    #[test]
    fn tenth_failure_locks_out() {
        let now = Utc::now();
        let mut attempts = AuthAttempts::default();
        for i in 0..9 {
            assert!(!attempts.record_failure(now + Duration::seconds(i)));
        }
        assert!(attempts.ensure_unlocked(now).is_ok());
        assert!(attempts.record_failure(now + Duration::seconds(9)));
        assert!(matches!(
            attempts.ensure_unlocked(now + Duration::seconds(10)),
            Err(TycoonError::LockedOut { .. })
        ));
        assert!(attempts
            .ensure_unlocked(now + Duration::seconds(LOCKOUT_SECONDS + 10))
            .is_ok());
    }

    #[test]
    fn old_failures_fall_out_of_window() {
        let now = Utc::now();
        let mut attempts = AuthAttempts::default();
        for _ in 0..9 {
            attempts.record_failure(now);
        }
        let later = now + Duration::seconds(FAILED_ATTEMPT_WINDOW_SECONDS + 1);
        assert!(!attempts.record_failure(later));
        assert_eq!(attempts.failures.len(), 1);
        assert!(!attempts.is_stale(later));
        assert!(attempts.is_stale(later + Duration::seconds(FAILED_ATTEMPT_WINDOW_SECONDS + 1)));
    }
}
