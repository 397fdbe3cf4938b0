//! Essence: a per-variation resource produced by Meks in essence slots.
//!
//! Each slotted Mek produces essence for its head, body and item variation.
//! A variation carried by several slotted Meks accrues once per Mek:
//!
//! ```text
//! earned  = rate_per_day × multiplier × days × count
//! balance = min(balance + earned, cap + cap_bonus)
//! ```
//!
//! Amounts are hundredths, like gold. Slot 1 starts unlocked. Slots 2 to 5
//! cost gold plus essence of variations drawn per wallet from the configured
//! rarity groups, so every wallet sees the same requirements on every visit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::MinerAccount;
use crate::accrual::{self, AccrualCap};
use crate::error::{Result, TycoonError};
use crate::ids::{MekNumber, StakeAddress};
use crate::mek::MekRecord;
use crate::tenure::BASIS_POINTS;

/// Essence slots per wallet.
pub const ESSENCE_SLOTS: u8 = 5;

/// Default essence per variation per Mek per day, in hundredths (0.1).
pub const DEFAULT_ESSENCE_PER_DAY: u64 = 10;

/// Default balance cap per variation, in hundredths (10).
pub const DEFAULT_ESSENCE_CAP: u64 = 1_000;

/// Number of rarity groups slot requirements are drawn from.
pub const RARITY_GROUPS: usize = 4;

const HOURS_PER_DAY: u64 = 24;

/// Which part of a Mek a variation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationKind {
    /// Head variation.
    Head,
    /// Body variation.
    Body,
    /// Item (trait) variation.
    Item,
}

impl VariationKind {
    /// Lowercase name used in variation keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
            Self::Item => "item",
        }
    }
}

/// One variation of a Mek.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    /// Head, body or item.
    pub kind: VariationKind,
    /// Variation code from the source key, lowercase.
    pub code: String,
}

impl Variation {
    /// Balance key, e.g. `head:aa1`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.code)
    }
}

/// Variations encoded in a Mek source key such as `AA1-BB2-CC3-B`.
///
/// The optional one-letter suffix is ignored. Returns `None` for keys that
/// do not have exactly three codes.
#[must_use]
pub fn variations_from_source_key(source_key: &str) -> Option<Vec<Variation>> {
    let lower = source_key.trim().to_ascii_lowercase();
    let parts: Vec<&str> = lower.split('-').collect();
    let codes = match parts.as_slice() {
        [head, body, item] => [*head, *body, *item],
        [head, body, item, suffix] if suffix.len() == 1 => [*head, *body, *item],
        _ => return None,
    };
    if codes
        .iter()
        .any(|code| code.is_empty() || !code.bytes().all(|b| b.is_ascii_alphanumeric()))
    {
        return None;
    }
    let kinds = [VariationKind::Head, VariationKind::Body, VariationKind::Item];
    Some(
        kinds
            .into_iter()
            .zip(codes)
            .map(|(kind, code)| Variation {
                kind,
                code: code.to_string(),
            })
            .collect(),
    )
}

/// Price of unlocking one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUnlock {
    /// Gold cost, hundredths.
    pub gold_cost: u64,
    /// Distinct variations whose essence is required.
    pub essence_count: usize,
    /// Essence required per variation, hundredths.
    pub amount_required: u64,
}

/// Global essence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssenceConfig {
    /// Essence per variation per Mek per day, hundredths.
    pub rate_per_day: u64,
    /// Balance cap per variation, hundredths.
    pub cap: u64,
    /// Unlock price of slots 2 to 5.
    pub slot_unlocks: BTreeMap<u8, SlotUnlock>,
    /// Variation keys by rarity, most common first. Slot `n` draws its
    /// requirements from the first `n - 1` groups.
    pub rarity_groups: Vec<Vec<String>>,
    /// First swap cost, hundredths.
    pub swap_base_cost: u64,
    /// Added to the swap cost after every swap.
    pub swap_cost_increment: u64,
    /// Largest swap cost.
    pub swap_cost_max: u64,
}

impl Default for EssenceConfig {
    fn default() -> Self {
        let unlock = |gold: u64, essence_count: usize, whole: u64| SlotUnlock {
            gold_cost: gold * 100,
            essence_count,
            amount_required: whole * 100,
        };
        Self {
            rate_per_day: DEFAULT_ESSENCE_PER_DAY,
            cap: DEFAULT_ESSENCE_CAP,
            slot_unlocks: BTreeMap::from([
                (2, unlock(10_000, 2, 5)),
                (3, unlock(50_000, 3, 7)),
                (4, unlock(150_000, 4, 9)),
                (5, unlock(500_000, 5, 10)),
            ]),
            rarity_groups: vec![Vec::new(); RARITY_GROUPS],
            swap_base_cost: 100_000,
            swap_cost_increment: 50_000,
            swap_cost_max: 1_000_000,
        }
    }
}

impl EssenceConfig {
    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`TycoonError::InvalidEssenceConfig`] naming the first problem.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(TycoonError::InvalidEssenceConfig(msg.to_string())) };
        if self.cap == 0 {
            return invalid("cap must be positive");
        }
        if !self.slot_unlocks.keys().copied().eq(2..=ESSENCE_SLOTS) {
            return invalid("slot_unlocks must cover slots 2 to 5");
        }
        if self.rarity_groups.len() > RARITY_GROUPS {
            return invalid("at most 4 rarity groups");
        }
        if self.swap_cost_max < self.swap_base_cost {
            return invalid("swap_cost_max must not be below swap_base_cost");
        }
        Ok(())
    }

    /// Variations slot `slot` may require.
    fn requirement_pool(&self, slot: u8) -> Vec<String> {
        self.rarity_groups
            .iter()
            .take(usize::from(slot.saturating_sub(1)))
            .flatten()
            .cloned()
            .collect()
    }
}

/// Partial configuration change. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EssenceConfigUpdate {
    /// New daily rate.
    #[serde(default)]
    pub rate_per_day: Option<u64>,
    /// New cap.
    #[serde(default)]
    pub cap: Option<u64>,
    /// Replaced slot prices, by slot.
    #[serde(default)]
    pub slot_unlocks: Option<BTreeMap<u8, SlotUnlock>>,
    /// Replaced rarity groups.
    #[serde(default)]
    pub rarity_groups: Option<Vec<Vec<String>>>,
    /// New first swap cost.
    #[serde(default)]
    pub swap_base_cost: Option<u64>,
    /// New swap cost step.
    #[serde(default)]
    pub swap_cost_increment: Option<u64>,
    /// New swap cost ceiling.
    #[serde(default)]
    pub swap_cost_max: Option<u64>,
}

impl EssenceConfigUpdate {
    /// Apply the change to `config` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`TycoonError::InvalidEssenceConfig`] if the result is unusable.
    pub fn apply(self, config: &EssenceConfig) -> Result<EssenceConfig> {
        let mut next = config.clone();
        if let Some(rate) = self.rate_per_day {
            next.rate_per_day = rate;
        }
        if let Some(cap) = self.cap {
            next.cap = cap;
        }
        if let Some(unlocks) = self.slot_unlocks {
            next.slot_unlocks.extend(unlocks);
        }
        if let Some(groups) = self.rarity_groups {
            next.rarity_groups = groups;
        }
        if let Some(cost) = self.swap_base_cost {
            next.swap_base_cost = cost;
        }
        if let Some(step) = self.swap_cost_increment {
            next.swap_cost_increment = step;
        }
        if let Some(max) = self.swap_cost_max {
            next.swap_cost_max = max;
        }
        next.validate()?;
        Ok(next)
    }
}

/// A player's bonus for one variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssenceBuff {
    /// Rate multiplier in basis points (15000 = 1.5×).
    pub rate_multiplier_bps: u32,
    /// Added to the cap, hundredths.
    pub cap_bonus: u64,
}

impl Default for EssenceBuff {
    fn default() -> Self {
        Self {
            rate_multiplier_bps: 10_000,
            cap_bonus: 0,
        }
    }
}

/// Essence needed to unlock a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequirement {
    /// Variation key.
    pub variation: String,
    /// Amount, hundredths.
    pub amount: u64,
}

/// A Mek sitting in an essence slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlottedMek {
    /// Mek number.
    pub mek_number: MekNumber,
    /// On-chain asset id.
    pub asset_id: String,
    /// Head, body and item variations.
    pub variations: Vec<Variation>,
    /// When it was slotted.
    pub slotted_at: DateTime<Utc>,
}

/// One essence slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssenceSlot {
    /// 1-based slot number.
    pub slot_number: u8,
    /// When the slot was unlocked. `None` while locked.
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Gold needed to unlock, hundredths.
    pub gold_cost: u64,
    /// Essence needed to unlock.
    pub requirements: Vec<SlotRequirement>,
    /// The slotted Mek.
    pub mek: Option<SlottedMek>,
}

impl EssenceSlot {
    /// Whether the slot accepts Meks.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// Deterministic per-wallet draw, so requirements never reroll.
struct WalletRng(u64);

impl WalletRng {
    fn for_wallet(wallet: &StakeAddress) -> Self {
        let hash = wallet
            .as_str()
            .bytes()
            .fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(b)));
        Self(u64::from(hash.unsigned_abs()))
    }

    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223) % (1 << 32);
        self.0
    }

    /// Up to `count` distinct entries of `pool`.
    fn pick(&mut self, pool: &[String], count: usize) -> Vec<String> {
        let mut pool = pool.to_vec();
        pool.sort();
        pool.dedup();
        let count = count.min(pool.len());
        for i in 0..count {
            let span = u64::try_from(pool.len() - i).unwrap_or(u64::MAX);
            let j = i + usize::try_from(self.next() % span).unwrap_or(0);
            pool.swap(i, j);
        }
        pool.truncate(count);
        pool
    }
}

/// A wallet's essence slots, balances and buffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssenceState {
    /// Owning wallet.
    pub wallet: StakeAddress,
    /// Slots 1 to 5.
    pub slots: Vec<EssenceSlot>,
    /// Settled essence by variation key, hundredths.
    pub balances: BTreeMap<String, u64>,
    /// Buffs by variation key.
    pub buffs: BTreeMap<String, EssenceBuff>,
    /// Balances are settled up to here.
    pub last_calculation: DateTime<Utc>,
    /// Last daily checkpoint.
    pub last_checkpoint: DateTime<Utc>,
    /// Swaps made.
    pub total_swap_count: u32,
    /// Cost of the last swap, zero before the first.
    pub current_swap_cost: u64,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

impl EssenceState {
    /// Fresh state: slot 1 open, slots 2 to 5 priced from `config`.
    #[must_use]
    pub fn new(wallet: StakeAddress, config: &EssenceConfig, now: DateTime<Utc>) -> Self {
        let mut rng = WalletRng::for_wallet(&wallet);
        let slots = (1..=ESSENCE_SLOTS)
            .map(|slot_number| {
                if slot_number == 1 {
                    return EssenceSlot {
                        slot_number,
                        unlocked_at: Some(now),
                        gold_cost: 0,
                        requirements: Vec::new(),
                        mek: None,
                    };
                }
                let unlock = config.slot_unlocks.get(&slot_number);
                let requirements = unlock
                    .map(|unlock| {
                        rng.pick(&config.requirement_pool(slot_number), unlock.essence_count)
                            .into_iter()
                            .map(|variation| SlotRequirement {
                                variation,
                                amount: unlock.amount_required,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                EssenceSlot {
                    slot_number,
                    unlocked_at: None,
                    gold_cost: unlock.map_or(0, |u| u.gold_cost),
                    requirements,
                    mek: None,
                }
            })
            .collect();

        Self {
            wallet,
            slots,
            balances: BTreeMap::new(),
            buffs: BTreeMap::new(),
            last_calculation: now,
            last_checkpoint: now,
            total_swap_count: 0,
            current_swap_cost: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether any slot holds a Mek.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slots.iter().any(|slot| slot.mek.is_some())
    }

    /// Slotted Meks carrying each variation.
    #[must_use]
    pub fn variation_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for variation in self
            .slots
            .iter()
            .filter_map(|slot| slot.mek.as_ref())
            .flat_map(|mek| &mek.variations)
        {
            *counts.entry(variation.key()).or_insert(0) += 1;
        }
        counts
    }

    /// Essence earned per day by each variation, after buffs.
    #[must_use]
    pub fn daily_rates(&self, config: &EssenceConfig) -> BTreeMap<String, u64> {
        self.variation_counts()
            .into_iter()
            .map(|(variation, count)| {
                let buff = self.buffs.get(&variation).copied().unwrap_or_default();
                let rate = u128::from(config.rate_per_day)
                    * u128::from(buff.rate_multiplier_bps)
                    * u128::from(count)
                    / u128::from(BASIS_POINTS);
                (variation, u64::try_from(rate).unwrap_or(u64::MAX))
            })
            .collect()
    }

    /// Cap for one variation including its buff.
    #[must_use]
    pub fn cap_for(&self, variation: &str, config: &EssenceConfig) -> u64 {
        let bonus = self.buffs.get(variation).map_or(0, |buff| buff.cap_bonus);
        config.cap.saturating_add(bonus)
    }

    /// Move accrued essence into the balances.
    ///
    /// A balance already above its cap (an admin grant) is left as is.
    pub fn settle(&mut self, config: &EssenceConfig, now: DateTime<Utc>) {
        if now <= self.last_calculation {
            return;
        }
        // Whole elapsed span in "day-hours": the hourly accrual formula over
        // elapsed / 24 yields a daily rate.
        let elapsed = accrual::elapsed_millis(self.last_calculation, now) / HOURS_PER_DAY;
        for (variation, rate) in self.daily_rates(config) {
            let earned = accrual::pending_for_millis(rate, elapsed, AccrualCap::Unlimited);
            let cap = self.cap_for(&variation, config);
            let balance = self.balances.entry(variation).or_insert(0);
            if *balance < cap {
                *balance = balance.saturating_add(earned).min(cap);
            }
        }
        self.last_calculation = now;
    }

    /// Balances including what accrued since the last settlement.
    #[must_use]
    pub fn balances_at(&self, config: &EssenceConfig, now: DateTime<Utc>) -> BTreeMap<String, u64> {
        let mut view = self.clone();
        view.settle(config, now);
        view.balances
    }

    /// Settle and record the daily checkpoint.
    pub fn checkpoint(&mut self, config: &EssenceConfig, now: DateTime<Utc>) {
        self.settle(config, now);
        self.last_checkpoint = now;
        self.updated_at = now;
    }

    fn slot_index(&self, slot: u8) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.slot_number == slot)
            .ok_or(TycoonError::InvalidSlot { slot })
    }

    /// Check that `wallet` may put `mek` in slot `index`, returning its variations.
    fn slottable(&self, wallet: &StakeAddress, mek: &MekRecord, index: usize) -> Result<Vec<Variation>> {
        mek.ensure_owner(wallet)?;
        let number = mek.mek_number;
        if self
            .slots
            .iter()
            .enumerate()
            .any(|(i, slot)| i != index && slot.mek.as_ref().is_some_and(|m| m.mek_number == number))
        {
            return Err(TycoonError::AlreadySlotted { mek: number.get() });
        }
        mek.source_key
            .as_deref()
            .and_then(variations_from_source_key)
            .ok_or(TycoonError::UnknownVariations { mek: number.get() })
    }

    fn place(&mut self, index: usize, mek: &MekRecord, variations: Vec<Variation>, now: DateTime<Utc>) {
        self.slots[index].mek = Some(SlottedMek {
            mek_number: mek.mek_number,
            asset_id: mek.asset_id.clone(),
            variations,
            slotted_at: now,
        });
        self.updated_at = now;
    }

    /// Put an owned Mek into an empty, unlocked slot.
    ///
    /// # Errors
    ///
    /// Fails if the slot is unknown, locked or occupied, the wallet does not
    /// own the Mek, the Mek sits in another slot, or its variations are unknown.
    pub fn slot(
        &mut self,
        wallet: &StakeAddress,
        slot: u8,
        mek: &MekRecord,
        config: &EssenceConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let index = self.slot_index(slot)?;
        if !self.slots[index].is_unlocked() {
            return Err(TycoonError::SlotLocked { slot });
        }
        if let Some(occupant) = &self.slots[index].mek {
            return Err(TycoonError::SlotOccupied {
                slot,
                mek: occupant.mek_number.get(),
            });
        }
        let variations = self.slottable(wallet, mek, index)?;
        self.settle(config, now);
        self.place(index, mek, variations, now);
        Ok(())
    }

    /// Empty a slot. Returns the Mek that was in it.
    ///
    /// # Errors
    ///
    /// Fails if the slot is unknown or empty.
    pub fn unslot(&mut self, slot: u8, config: &EssenceConfig, now: DateTime<Utc>) -> Result<SlottedMek> {
        let index = self.slot_index(slot)?;
        if self.slots[index].mek.is_none() {
            return Err(TycoonError::SlotEmpty { slot });
        }
        self.settle(config, now);
        let removed = self.slots[index].mek.take().ok_or(TycoonError::SlotEmpty { slot })?;
        self.updated_at = now;
        Ok(removed)
    }

    /// Gold the next swap costs.
    #[must_use]
    pub fn next_swap_cost(&self, config: &EssenceConfig) -> u64 {
        if self.current_swap_cost == 0 {
            config.swap_base_cost
        } else {
            self.current_swap_cost
                .saturating_add(config.swap_cost_increment)
                .min(config.swap_cost_max)
        }
    }

    /// Replace the Mek in an occupied slot, paying the swap cost in gold.
    /// Returns the gold spent.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::slot`], if the slot is empty, or if the account
    /// cannot pay.
    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        &mut self,
        wallet: &StakeAddress,
        slot: u8,
        mek: &MekRecord,
        account: &mut MinerAccount,
        config: &EssenceConfig,
        gold_cap: AccrualCap,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let index = self.slot_index(slot)?;
        let current = self.slots[index]
            .mek
            .as_ref()
            .ok_or(TycoonError::SlotEmpty { slot })?;
        if current.mek_number == mek.mek_number {
            return Err(TycoonError::AlreadySlotted {
                mek: mek.mek_number.get(),
            });
        }
        let variations = self.slottable(wallet, mek, index)?;

        let cost = self.next_swap_cost(config);
        if cost > 0 {
            account.spend_gold(cost, now, gold_cap)?;
        }
        self.settle(config, now);
        self.place(index, mek, variations, now);
        self.total_swap_count = self.total_swap_count.saturating_add(1);
        self.current_swap_cost = cost;
        Ok(cost)
    }

    /// Unlock a slot, paying its gold and essence price.
    ///
    /// # Errors
    ///
    /// Fails if the slot is unknown or already open, or if gold or any
    /// required essence is short. Nothing is spent on failure.
    pub fn unlock_slot(
        &mut self,
        slot: u8,
        account: &mut MinerAccount,
        config: &EssenceConfig,
        gold_cap: AccrualCap,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let index = self.slot_index(slot)?;
        if self.slots[index].is_unlocked() {
            return Err(TycoonError::SlotAlreadyUnlocked { slot });
        }
        self.settle(config, now);

        for requirement in &self.slots[index].requirements {
            let available = self.balance(&requirement.variation);
            if available < requirement.amount {
                return Err(TycoonError::InsufficientEssence {
                    variation: requirement.variation.clone(),
                    available,
                    required: requirement.amount,
                });
            }
        }
        let gold_cost = self.slots[index].gold_cost;
        if gold_cost > 0 {
            account.spend_gold(gold_cost, now, gold_cap)?;
        }

        let requirements = self.slots[index].requirements.clone();
        for requirement in requirements {
            if let Some(balance) = self.balances.get_mut(&requirement.variation) {
                *balance -= requirement.amount;
            }
        }
        self.slots[index].unlocked_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Settled balance of one variation.
    #[must_use]
    pub fn balance(&self, variation: &str) -> u64 {
        self.balances.get(variation).copied().unwrap_or(0)
    }

    /// Grant essence outside the cap. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Rejects an empty variation key or a zero amount.
    pub fn add_essence(
        &mut self,
        variation: &str,
        amount: u64,
        config: &EssenceConfig,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        if variation.trim().is_empty() {
            return Err(TycoonError::InvalidAmount("variation must not be empty".to_string()));
        }
        if amount == 0 {
            return Err(TycoonError::InvalidAmount("essence amount must be positive".to_string()));
        }
        self.settle(config, now);
        let balance = self.balances.entry(variation.trim().to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
        self.updated_at = now;
        Ok(*balance)
    }

    /// Set the buff of one variation. A neutral buff removes it.
    ///
    /// Essence accrued so far keeps the previous rate.
    pub fn set_buff(&mut self, variation: &str, buff: EssenceBuff, config: &EssenceConfig, now: DateTime<Utc>) {
        self.settle(config, now);
        if buff == EssenceBuff::default() {
            self.buffs.remove(variation);
        } else {
            self.buffs.insert(variation.to_string(), buff);
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn wallet(fill: char) -> StakeAddress {
        format!("stake1{}", fill.to_string().repeat(53)).parse().unwrap()
    }

    fn mek(number: u16, owner: &StakeAddress, source_key: &str) -> MekRecord {
        let mut record = MekRecord::new(
            MekNumber::new(number).unwrap(),
            format!("asset{number}"),
            Some(owner.clone()),
            Utc::now(),
        );
        record.source_key = Some(source_key.to_string());
        record
    }

    fn rich_account(owner: &StakeAddress, now: DateTime<Utc>) -> MinerAccount {
        let mut account = MinerAccount::new(owner.clone(), now);
        account.accumulated_gold = 100_000_000;
        account
    }

    #[test]
    fn source_keys_yield_three_variations() {
        let variations = variations_from_source_key("AA1-BB2-CC3-B").unwrap();
        let keys: Vec<String> = variations.iter().map(Variation::key).collect();
        assert_eq!(keys, ["head:aa1", "body:bb2", "item:cc3"]);
        assert_eq!(variations_from_source_key("aa1-bb2-cc3").unwrap().len(), 3);
        assert!(variations_from_source_key("aa1-bb2").is_none());
        assert!(variations_from_source_key("aa1--cc3").is_none());
        assert!(variations_from_source_key("aa1-bb2-cc3-xyz").is_none());
    }

    #[test]
    fn new_state_opens_only_the_first_slot() {
        let now = Utc::now();
        let state = EssenceState::new(wallet('a'), &EssenceConfig::default(), now);
        assert_eq!(state.slots.len(), usize::from(ESSENCE_SLOTS));
        assert!(state.slots[0].is_unlocked());
        assert!(state.slots[1..].iter().all(|slot| !slot.is_unlocked()));
        assert_eq!(state.slots[1].gold_cost, 1_000_000);
        assert!(!state.is_active());
    }

    #[test]
    fn requirements_are_stable_per_wallet_and_drawn_from_allowed_groups() {
        let config = EssenceConfig {
            rarity_groups: vec![
                vec!["head:aa1".into(), "head:aa2".into(), "body:bb1".into()],
                vec!["item:cc1".into(), "item:cc2".into()],
                vec!["head:rare".into()],
                vec!["item:legend".into()],
            ],
            ..EssenceConfig::default()
        };
        let now = Utc::now();
        let first = EssenceState::new(wallet('a'), &config, now);
        let again = EssenceState::new(wallet('a'), &config, now + Duration::days(3));
        assert_eq!(
            first.slots.iter().map(|s| &s.requirements).collect::<Vec<_>>(),
            again.slots.iter().map(|s| &s.requirements).collect::<Vec<_>>()
        );

        let slot2 = &first.slots[1].requirements;
        assert_eq!(slot2.len(), 2);
        assert!(slot2.iter().all(|r| config.rarity_groups[0].contains(&r.variation)));
        assert!(slot2.iter().all(|r| r.amount == 500));

        // Slot 5 wants 5 of the 7 variations, all distinct.
        let slot5: Vec<&String> = first.slots[4].requirements.iter().map(|r| &r.variation).collect();
        assert_eq!(slot5.len(), 5);
        let mut unique = slot5.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn shared_variations_accrue_per_mek_up_to_the_cap() {
        let owner = wallet('a');
        let start = Utc::now();
        let config = EssenceConfig::default();
        let mut state = EssenceState::new(owner.clone(), &config, start);
        let mut account = rich_account(&owner, start);
        state.unlock_slot(2, &mut account, &config, AccrualCap::default(), start).unwrap();

        state.slot(&owner, 1, &mek(1, &owner, "aa1-bb1-cc1-B"), &config, start).unwrap();
        state.slot(&owner, 2, &mek(2, &owner, "aa1-bb2-cc2-B"), &config, start).unwrap();
        assert!(state.is_active());
        assert_eq!(state.variation_counts()["head:aa1"], 2);

        let later = start + Duration::days(10);
        let balances = state.balances_at(&config, later);
        // 0.1/day × 10 days × 2 Meks.
        assert_eq!(balances["head:aa1"], 200);
        assert_eq!(balances["body:bb1"], 100);

        // 0.1/day × 100 days would be 10 per Mek, capped at 10 total.
        state.settle(&config, start + Duration::days(100));
        assert_eq!(state.balance("head:aa1"), DEFAULT_ESSENCE_CAP);
        assert_eq!(state.balance("item:cc2"), DEFAULT_ESSENCE_CAP);
    }

    #[test]
    fn buffs_raise_rate_and_cap() {
        let owner = wallet('a');
        let start = Utc::now();
        let config = EssenceConfig::default();
        let mut state = EssenceState::new(owner.clone(), &config, start);
        state.slot(&owner, 1, &mek(1, &owner, "aa1-bb1-cc1"), &config, start).unwrap();
        state.set_buff(
            "head:aa1",
            EssenceBuff {
                rate_multiplier_bps: 20_000,
                cap_bonus: 500,
            },
            &config,
            start,
        );

        state.settle(&config, start + Duration::days(10));
        assert_eq!(state.balance("head:aa1"), 200);
        assert_eq!(state.balance("body:bb1"), 100);

        state.settle(&config, start + Duration::days(1_000));
        assert_eq!(state.balance("head:aa1"), 1_500);
        assert_eq!(state.balance("body:bb1"), 1_000);

        state.set_buff("head:aa1", EssenceBuff::default(), &config, start + Duration::days(1_000));
        assert!(state.buffs.is_empty());
    }

    #[test]
    fn granted_essence_above_the_cap_is_kept() {
        let owner = wallet('a');
        let start = Utc::now();
        let config = EssenceConfig::default();
        let mut state = EssenceState::new(owner.clone(), &config, start);
        assert_eq!(state.add_essence("head:aa1", 5_000, &config, start).unwrap(), 5_000);
        state.slot(&owner, 1, &mek(1, &owner, "aa1-bb1-cc1"), &config, start).unwrap();
        state.settle(&config, start + Duration::days(30));
        assert_eq!(state.balance("head:aa1"), 5_000);
        assert!(state.add_essence("head:aa1", 0, &config, start).is_err());
    }

    #[test]
    fn slot_rules() {
        let owner = wallet('a');
        let now = Utc::now();
        let config = EssenceConfig::default();
        let mut state = EssenceState::new(owner.clone(), &config, now);
        let first = mek(1, &owner, "aa1-bb1-cc1");

        assert_eq!(
            state.slot(&owner, 2, &first, &config, now),
            Err(TycoonError::SlotLocked { slot: 2 })
        );
        assert_eq!(
            state.slot(&owner, 9, &first, &config, now),
            Err(TycoonError::InvalidSlot { slot: 9 })
        );
        assert_eq!(
            state.slot(&wallet('b'), 1, &first, &config, now),
            Err(TycoonError::NotOwner { mek: 1 })
        );

        let mut unknown = mek(3, &owner, "x");
        unknown.source_key = None;
        assert_eq!(
            state.slot(&owner, 1, &unknown, &config, now),
            Err(TycoonError::UnknownVariations { mek: 3 })
        );

        state.slot(&owner, 1, &first, &config, now).unwrap();
        assert_eq!(
            state.slot(&owner, 1, &mek(2, &owner, "aa2-bb2-cc2"), &config, now),
            Err(TycoonError::SlotOccupied { slot: 1, mek: 1 })
        );

        let removed = state.unslot(1, &config, now).unwrap();
        assert_eq!(removed.mek_number.get(), 1);
        assert!(!state.is_active());
        assert_eq!(state.unslot(1, &config, now), Err(TycoonError::SlotEmpty { slot: 1 }));
    }

    #[test]
    fn swap_cost_grows_to_the_max() {
        let owner = wallet('a');
        let now = Utc::now();
        let config = EssenceConfig {
            swap_base_cost: 100,
            swap_cost_increment: 100,
            swap_cost_max: 250,
            ..EssenceConfig::default()
        };
        let mut state = EssenceState::new(owner.clone(), &config, now);
        let mut account = MinerAccount::new(owner.clone(), now);
        account.accumulated_gold = 1_000;

        state.slot(&owner, 1, &mek(1, &owner, "aa1-bb1-cc1"), &config, now).unwrap();
        let costs: Vec<u64> = [2, 3, 4]
            .into_iter()
            .map(|n| {
                state
                    .swap(&owner, 1, &mek(n, &owner, "aa2-bb2-cc2"), &mut account, &config, AccrualCap::default(), now)
                    .unwrap()
            })
            .collect();
        assert_eq!(costs, [100, 200, 250]);
        assert_eq!(account.accumulated_gold, 450);
        assert_eq!(state.total_swap_count, 3);
        assert_eq!(state.slots[0].mek.as_ref().unwrap().mek_number.get(), 4);

        assert_eq!(
            state.swap(&owner, 2, &mek(5, &owner, "aa2-bb2-cc2"), &mut account, &config, AccrualCap::default(), now),
            Err(TycoonError::SlotEmpty { slot: 2 })
        );
    }

    #[test]
    fn unlock_spends_gold_and_essence_or_nothing() {
        let owner = wallet('a');
        let now = Utc::now();
        let config = EssenceConfig {
            rarity_groups: vec![vec!["head:aa1".into(), "body:bb1".into()]],
            ..EssenceConfig::default()
        };
        let mut state = EssenceState::new(owner.clone(), &config, now);
        let mut account = rich_account(&owner, now);

        let err = state
            .unlock_slot(2, &mut account, &config, AccrualCap::default(), now)
            .unwrap_err();
        assert!(matches!(err, TycoonError::InsufficientEssence { required: 500, .. }));
        assert_eq!(account.accumulated_gold, 100_000_000);

        state.add_essence("head:aa1", 600, &config, now).unwrap();
        state.add_essence("body:bb1", 500, &config, now).unwrap();
        state.unlock_slot(2, &mut account, &config, AccrualCap::default(), now).unwrap();
        assert!(state.slots[1].is_unlocked());
        assert_eq!(state.balance("head:aa1"), 100);
        assert_eq!(state.balance("body:bb1"), 0);
        assert_eq!(account.accumulated_gold, 99_000_000);

        assert_eq!(
            state.unlock_slot(2, &mut account, &config, AccrualCap::default(), now),
            Err(TycoonError::SlotAlreadyUnlocked { slot: 2 })
        );

        let plain = EssenceConfig::default();
        let mut poor = MinerAccount::new(owner.clone(), now);
        let err = EssenceState::new(owner.clone(), &plain, now)
            .unlock_slot(3, &mut poor, &plain, AccrualCap::default(), now)
            .unwrap_err();
        assert!(matches!(err, TycoonError::InsufficientGold { .. }));
    }

    #[test]
    fn config_updates_are_validated() {
        let config = EssenceConfig::default();
        assert!(config.validate().is_ok());

        let updated = EssenceConfigUpdate {
            rate_per_day: Some(25),
            ..EssenceConfigUpdate::default()
        }
        .apply(&config)
        .unwrap();
        assert_eq!(updated.rate_per_day, 25);
        assert_eq!(updated.cap, config.cap);

        let bad = EssenceConfigUpdate {
            cap: Some(0),
            ..EssenceConfigUpdate::default()
        };
        assert!(matches!(bad.apply(&config), Err(TycoonError::InvalidEssenceConfig(_))));
        let bad_slot = EssenceConfigUpdate {
            slot_unlocks: Some(BTreeMap::from([(
                7,
                SlotUnlock {
                    gold_cost: 1,
                    essence_count: 1,
                    amount_required: 1,
                },
            )])),
            ..EssenceConfigUpdate::default()
        };
        assert!(bad_slot.apply(&config).is_err());
    }
}
