//! Mek records, slotting and tenure levels.
//!
//! Tenure accrues only while a Mek is slotted. Slotting starts the clock,
//! unslotting freezes the current value, and level-ups spend the frozen or
//! live tenure against the configured thresholds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accrual::{self, AccrualCap};
use crate::error::{Result, TycoonError};
use crate::ids::{MekNumber, StakeAddress};
use crate::tenure::TenureSettings;

/// Default limit for a batch level-up.
pub const DEFAULT_MAX_LEVELS: u32 = 999;

/// Persistent state of one Mek.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MekRecord {
    /// Collection number, the canonical key.
    pub mek_number: MekNumber,

    /// On-chain asset id.
    pub asset_id: String,

    /// Variation source key, when known.
    pub source_key: Option<String>,

    /// Current owner from the last verification.
    pub owner: Option<StakeAddress>,

    /// Level, starting at 1.
    pub level: u32,

    /// Tenure settled at `last_tenure_update`, in hundredths.
    pub tenure_points: u64,

    /// Rate in effect since `last_tenure_update`, hundredths per hour.
    pub tenure_rate: u64,

    /// Last tenure settlement.
    pub last_tenure_update: Option<DateTime<Utc>>,

    /// Whether the Mek sits in a slot.
    pub is_slotted: bool,

    /// Slot it sits in.
    pub slot_number: Option<u8>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Result of a level-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LevelUpOutcome {
    /// One or more levels were bought.
    LeveledUp {
        /// Level before.
        previous_level: u32,
        /// Level after.
        new_level: u32,
        /// Tenure consumed.
        tenure_spent: u64,
        /// Tenure carried over.
        tenure_remaining: u64,
    },
    /// Not enough tenure for the next level.
    NotEnoughTenure {
        /// Current level.
        level: u32,
        /// Tenure available.
        tenure: u64,
        /// Tenure needed for the next level.
        required: u64,
    },
}

impl MekRecord {
    /// A fresh level-1 record.
    #[must_use]
    pub fn new(
        mek_number: MekNumber,
        asset_id: String,
        owner: Option<StakeAddress>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            mek_number,
            asset_id,
            source_key: None,
            owner,
            level: 1,
            tenure_points: 0,
            tenure_rate: 0,
            last_tenure_update: None,
            is_slotted: false,
            slot_number: None,
            updated_at: now,
        }
    }

    /// Tenure including what accrued since the last settlement.
    #[must_use]
    pub fn current_tenure(&self, cap: AccrualCap, now: DateTime<Utc>) -> u64 {
        match (self.is_slotted, self.last_tenure_update) {
            (true, Some(since)) => self
                .tenure_points
                .saturating_add(accrual::pending(self.tenure_rate, since, now, cap)),
            _ => self.tenure_points,
        }
    }

    /// Check that `wallet` owns this Mek.
    ///
    /// # Errors
    ///
    /// Returns [`TycoonError::NotOwner`] otherwise.
    pub fn ensure_owner(&self, wallet: &StakeAddress) -> Result<()> {
        if self.owner.as_ref() == Some(wallet) {
            Ok(())
        } else {
            Err(TycoonError::NotOwner {
                mek: self.mek_number.get(),
            })
        }
    }

    /// Put the Mek in `slot` and start accruing at `rate`.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the owner or the Mek is already slotted.
    pub fn slot(
        &mut self,
        wallet: &StakeAddress,
        slot: u8,
        rate: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_owner(wallet)?;
        if self.is_slotted {
            return Err(TycoonError::AlreadySlotted {
                mek: self.mek_number.get(),
            });
        }
        self.is_slotted = true;
        self.slot_number = Some(slot);
        self.tenure_rate = rate;
        self.last_tenure_update = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Take the Mek out of its slot, freezing its tenure. Returns the frozen value.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the owner or the Mek is not slotted.
    pub fn unslot(&mut self, wallet: &StakeAddress, cap: AccrualCap, now: DateTime<Utc>) -> Result<u64> {
        self.ensure_owner(wallet)?;
        if !self.is_slotted {
            return Err(TycoonError::NotSlotted {
                mek: self.mek_number.get(),
            });
        }
        self.settle(cap, now);
        self.is_slotted = false;
        self.slot_number = None;
        self.updated_at = now;
        Ok(self.tenure_points)
    }

    /// Settle accrued tenure and continue at `rate`.
    ///
    /// Used when buffs change so that past tenure keeps the old rate.
    pub fn rerate(&mut self, rate: u64, cap: AccrualCap, now: DateTime<Utc>) {
        self.settle(cap, now);
        self.tenure_rate = rate;
        self.updated_at = now;
    }

    /// Buy up to `max_levels` levels with accumulated tenure.
    ///
    /// Excess tenure carries over. Running short is an outcome, not an error.
    ///
    /// # Errors
    ///
    /// Fails if the caller is not the owner, or if the next level has no
    /// configured threshold.
    pub fn level_up(
        &mut self,
        wallet: &StakeAddress,
        settings: &TenureSettings,
        max_levels: u32,
        now: DateTime<Utc>,
    ) -> Result<LevelUpOutcome> {
        self.ensure_owner(wallet)?;
        let first_required = settings
            .threshold_for(self.level + 1)
            .ok_or(TycoonError::LevelNotConfigured {
                level: self.level + 1,
            })?;

        self.settle(settings.cap, now);
        let previous_level = self.level;
        let mut spent = 0u64;

        while self.level - previous_level < max_levels {
            let Some(required) = settings.threshold_for(self.level + 1) else {
                break;
            };
            if self.tenure_points < required {
                break;
            }
            self.tenure_points -= required;
            spent = spent.saturating_add(required);
            self.level += 1;
        }

        if self.level == previous_level {
            return Ok(LevelUpOutcome::NotEnoughTenure {
                level: self.level,
                tenure: self.tenure_points,
                required: first_required,
            });
        }
        self.updated_at = now;
        Ok(LevelUpOutcome::LeveledUp {
            previous_level,
            new_level: self.level,
            tenure_spent: spent,
            tenure_remaining: self.tenure_points,
        })
    }

    /// Hand the Mek to a new owner, unslotting it if it changed hands.
    pub fn transfer_to(&mut self, owner: StakeAddress, cap: AccrualCap, now: DateTime<Utc>) {
        if self.owner.as_ref() != Some(&owner) && self.is_slotted {
            self.settle(cap, now);
            self.is_slotted = false;
            self.slot_number = None;
        }
        self.owner = Some(owner);
        self.updated_at = now;
    }

    /// Forget the owner after the Mek left the wallet, freezing its tenure.
    pub fn clear_owner(&mut self, cap: AccrualCap, now: DateTime<Utc>) {
        if self.is_slotted {
            self.settle(cap, now);
            self.is_slotted = false;
            self.slot_number = None;
        }
        self.owner = None;
        self.updated_at = now;
    }

    fn settle(&mut self, cap: AccrualCap, now: DateTime<Utc>) {
        self.tenure_points = self.current_tenure(cap, now);
        if self.is_slotted {
            self.last_tenure_update = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn owner() -> StakeAddress {
        "stake1u8pcjgmx7962w6hey5hhsd502araxp26kdtgagakhaqtq8squng76"
            .parse()
            .unwrap()
    }

    fn stranger() -> StakeAddress {
        format!("stake1{}", "x".repeat(53)).parse().unwrap()
    }

    fn record(now: DateTime<Utc>) -> MekRecord {
        MekRecord::new(MekNumber::new(42).unwrap(), "asset42".to_string(), Some(owner()), now)
    }

    fn settings() -> TenureSettings {
        let mut settings = TenureSettings::default();
        settings.level_thresholds.insert(2, 100_000);
        settings.level_thresholds.insert(3, 200_000);
        settings.level_thresholds.insert(4, 400_000);
        settings
    }

    #[test]
    fn tenure_accrues_only_while_slotted() {
        let start = Utc::now();
        let mut mek = record(start);
        assert_eq!(mek.current_tenure(AccrualCap::Unlimited, start + Duration::hours(1)), 0);

        mek.slot(&owner(), 1, 360_000, start).unwrap();
        let later = start + Duration::seconds(90);
        assert_eq!(mek.current_tenure(AccrualCap::Unlimited, later), 9_000);

        assert_eq!(mek.unslot(&owner(), AccrualCap::Unlimited, later).unwrap(), 9_000);
        let much_later = later + Duration::hours(3);
        assert_eq!(mek.current_tenure(AccrualCap::Unlimited, much_later), 9_000);
    }

    #[test]
    fn slot_rules() {
        let now = Utc::now();
        let mut mek = record(now);
        assert_eq!(
            mek.slot(&stranger(), 1, 1, now),
            Err(TycoonError::NotOwner { mek: 42 })
        );
        assert_eq!(
            mek.unslot(&owner(), AccrualCap::Unlimited, now),
            Err(TycoonError::NotSlotted { mek: 42 })
        );
        mek.slot(&owner(), 1, 1, now).unwrap();
        assert_eq!(
            mek.slot(&owner(), 2, 1, now),
            Err(TycoonError::AlreadySlotted { mek: 42 })
        );
    }

    #[test]
    fn level_up_carries_excess() {
        let now = Utc::now();
        let mut mek = record(now);
        mek.tenure_points = 150_000;
        let outcome = mek.level_up(&owner(), &settings(), 1, now).unwrap();
        assert_eq!(
            outcome,
            LevelUpOutcome::LeveledUp {
                previous_level: 1,
                new_level: 2,
                tenure_spent: 100_000,
                tenure_remaining: 50_000
            }
        );
    }

    #[test]
    fn level_up_short_is_not_an_error() {
        let now = Utc::now();
        let mut mek = record(now);
        mek.tenure_points = 99_999;
        let outcome = mek.level_up(&owner(), &settings(), 1, now).unwrap();
        assert_eq!(
            outcome,
            LevelUpOutcome::NotEnoughTenure {
                level: 1,
                tenure: 99_999,
                required: 100_000
            }
        );
        assert_eq!(mek.level, 1);
    }

    #[test]
    fn level_up_requires_configured_level() {
        let now = Utc::now();
        let mut mek = record(now);
        mek.tenure_points = 1_000_000;
        assert_eq!(
            mek.level_up(&owner(), &TenureSettings::default(), 1, now),
            Err(TycoonError::LevelNotConfigured { level: 2 })
        );
    }

    #[test]
    fn batch_level_up_stops_at_last_configured_level() {
        let now = Utc::now();
        let mut mek = record(now);
        mek.tenure_points = 1_000_000;
        let outcome = mek
            .level_up(&owner(), &settings(), DEFAULT_MAX_LEVELS, now)
            .unwrap();
        assert_eq!(
            outcome,
            LevelUpOutcome::LeveledUp {
                previous_level: 1,
                new_level: 4,
                tenure_spent: 700_000,
                tenure_remaining: 300_000
            }
        );
    }

    #[test]
    fn level_up_settles_live_tenure() {
        let start = Utc::now();
        let mut mek = record(start);
        mek.slot(&owner(), 1, 360_000, start).unwrap();
        let later = start + Duration::seconds(1_000);
        let outcome = mek.level_up(&owner(), &settings(), 1, later).unwrap();
        assert!(matches!(outcome, LevelUpOutcome::LeveledUp { new_level: 2, .. }));
        assert_eq!(mek.current_tenure(AccrualCap::Unlimited, later), 0);
    }

    #[test]
    fn transfer_unslots_for_new_owner() {
        let now = Utc::now();
        let mut mek = record(now);
        mek.slot(&owner(), 3, 360_000, now).unwrap();
        mek.transfer_to(stranger(), AccrualCap::Unlimited, now + Duration::seconds(10));
        assert!(!mek.is_slotted);
        assert_eq!(mek.tenure_points, 1_000);
        assert_eq!(mek.owner, Some(stranger()));
    }
}
