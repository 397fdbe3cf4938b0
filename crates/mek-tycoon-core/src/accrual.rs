//! Idle-resource accrual.
//!
//! Gold and tenure both grow linearly from their last checkpoint:
//!
//! ```text
//! pending = rate × min(now − last_checkpoint, cap)
//! ```
//!
//! Amounts are integer hundredths of a unit and rates are hundredths per hour,
//! so all arithmetic is integer, floors on division and saturates instead of
//! overflowing. A checkpoint in the future (clock skew) yields zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: u64 = 3_600_000;

/// Stored units per whole resource unit (`1 = 0.01`).
pub const UNITS_PER_WHOLE: u64 = 100;

/// Default offline window for gold.
pub const DEFAULT_GOLD_CAP_HOURS: u32 = 72;

/// How far back accrual may reach from a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualCap {
    /// Elapsed time is counted in full.
    Unlimited,
    /// Elapsed time is clamped to this many hours.
    Hours(u32),
}

impl AccrualCap {
    /// Build a cap from an optional hour count.
    #[must_use]
    pub fn from_hours(hours: Option<u32>) -> Self {
        hours.map_or(Self::Unlimited, Self::Hours)
    }

    /// Largest elapsed span that still accrues, in milliseconds.
    #[must_use]
    pub fn max_elapsed_millis(self) -> Option<u64> {
        match self {
            Self::Unlimited => None,
            Self::Hours(hours) => Some(u64::from(hours) * MILLIS_PER_HOUR),
        }
    }
}

impl Default for AccrualCap {
    fn default() -> Self {
        Self::Hours(DEFAULT_GOLD_CAP_HOURS)
    }
}

/// Milliseconds from `from` to `to`, zero if `to` is earlier.
#[must_use]
pub fn elapsed_millis(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

/// Amount accrued at `rate_per_hour` over `elapsed_millis`, after the cap.
#[must_use]
pub fn pending_for_millis(rate_per_hour: u64, elapsed_millis: u64, cap: AccrualCap) -> u64 {
    let counted = cap
        .max_elapsed_millis()
        .map_or(elapsed_millis, |max| elapsed_millis.min(max));
    let amount = u128::from(rate_per_hour) * u128::from(counted) / u128::from(MILLIS_PER_HOUR);
    u64::try_from(amount).unwrap_or(u64::MAX)
}

/// Amount accrued since `last_checkpoint`.
///
/// This is the single accrual formula shared by gold and tenure.
#[must_use]
pub fn pending(
    rate_per_hour: u64,
    last_checkpoint: DateTime<Utc>,
    now: DateTime<Utc>,
    cap: AccrualCap,
) -> u64 {
    pending_for_millis(rate_per_hour, elapsed_millis(last_checkpoint, now), cap)
}

/// Render hundredths as a decimal string, e.g. `1234` as `"12.34"`.
#[must_use]
pub fn format_units(amount: u64) -> String {
    format!(
        "{}.{:02}",
        amount / UNITS_PER_WHOLE,
        amount % UNITS_PER_WHOLE
    )
}
