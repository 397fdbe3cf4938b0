//! Tenure configuration and buffs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accrual::AccrualCap;
use crate::ids::{BuffId, MekNumber};

/// Base tenure rate: 1 tenure per second, in hundredths per hour.
pub const BASE_TENURE_PER_HOUR: u64 = 360_000;

/// One buff basis point is 0.01% of the base rate.
pub const BASIS_POINTS: u64 = 10_000;

/// Global tenure configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureSettings {
    /// Rate before buffs, hundredths per hour.
    pub base_rate_per_hour: u64,

    /// Offline window for tenure accrual.
    pub cap: AccrualCap,

    /// Tenure (hundredths) needed to reach each level.
    pub level_thresholds: BTreeMap<u32, u64>,
}

impl Default for TenureSettings {
    fn default() -> Self {
        Self {
            base_rate_per_hour: BASE_TENURE_PER_HOUR,
            cap: AccrualCap::Unlimited,
            level_thresholds: BTreeMap::new(),
        }
    }
}

impl TenureSettings {
    /// Threshold for reaching `level`, if configured.
    #[must_use]
    pub fn threshold_for(&self, level: u32) -> Option<u64> {
        self.level_thresholds.get(&level).copied()
    }
}

/// What a buff applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "mek", rename_all = "snake_case")]
pub enum BuffScope {
    /// Every slotted Mek.
    Global,
    /// A single Mek.
    Mek(MekNumber),
}

/// A bonus on top of the base tenure rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureBuff {
    /// Buff id.
    pub id: BuffId,
    /// Global or per-Mek.
    pub scope: BuffScope,
    /// Bonus in basis points (5000 = +50%).
    pub bonus_bps: u32,
    /// Admin toggle.
    pub active: bool,
    /// Optional end time.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the buff was created.
    pub created_at: DateTime<Utc>,
}

impl TenureBuff {
    /// Whether the buff counts for `mek` at `now`.
    #[must_use]
    pub fn applies_to(&self, mek: MekNumber, now: DateTime<Utc>) -> bool {
        if !self.active || self.expires_at.is_some_and(|end| end <= now) {
            return false;
        }
        match self.scope {
            BuffScope::Global => true,
            BuffScope::Mek(target) => target == mek,
        }
    }
}

/// Effective tenure rate: `base × (1 + Σ applicable bonuses)`.
#[must_use]
pub fn effective_rate(
    settings: &TenureSettings,
    buffs: &[TenureBuff],
    mek: MekNumber,
    now: DateTime<Utc>,
) -> u64 {
    let bonus: u64 = buffs
        .iter()
        .filter(|buff| buff.applies_to(mek, now))
        .map(|buff| u64::from(buff.bonus_bps))
        .sum();
    let rate = u128::from(settings.base_rate_per_hour) * u128::from(BASIS_POINTS + bonus)
        / u128::from(BASIS_POINTS);
    u64::try_from(rate).unwrap_or(u64::MAX)
}
