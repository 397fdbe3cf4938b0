//! Miner accounts and gold accrual.
//!
//! An account is keyed by its stake address and created on first wallet
//! connect. Gold accrues from `last_gold_collection` at `gold_per_hour`, but
//! only once the wallet has been verified on chain.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::accrual::{self, AccrualCap};
use crate::error::{Result, TycoonError};
use crate::ids::{MekNumber, StakeAddress};

// ============================================================================
// Constants
// ============================================================================

/// Minimum gap between two debounced checkpoints.
pub const CHECKPOINT_DEBOUNCE_SECONDS: i64 = 30;

/// Shortest company name after trimming.
pub const COMPANY_NAME_MIN_LEN: usize = 2;

/// Longest company name after trimming.
pub const COMPANY_NAME_MAX_LEN: usize = 30;

const BLOCKED_WORDS: [&str; 8] = ["fuck", "shit", "damn", "hell", "ass", "bitch", "crap", "piss"];

/// A Mek held by an account, as last seen on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedMek {
    /// Collection number.
    pub mek_number: MekNumber,

    /// Full on-chain asset id (policy id + hex asset name).
    pub asset_id: String,

    /// Variation source key, when known.
    #[serde(default)]
    pub source_key: Option<String>,

    /// Gold this Mek contributes, in hundredths per hour.
    pub gold_per_hour: u64,
}

/// A player account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerAccount {
    /// Wallet stake address.
    pub wallet: StakeAddress,

    /// Display name chosen by the player.
    pub company_name: Option<String>,

    /// Settled gold available to spend, in hundredths.
    pub accumulated_gold: u64,

    /// Every unit of gold ever settled. Never decreases.
    pub total_cumulative_gold: u64,

    /// Gold removed by spends.
    pub gold_spent: u64,

    /// Current rate: sum of owned Mek rates, in hundredths per hour.
    pub gold_per_hour: u64,

    /// Meks found in the wallet at the last verification.
    pub owned_meks: Vec<OwnedMek>,

    /// Whether ownership was confirmed on chain. Unverified accounts do not accrue.
    pub is_blockchain_verified: bool,

    /// Last gold settlement.
    pub last_gold_collection: DateTime<Utc>,

    /// Last player action.
    pub last_active_time: DateTime<Utc>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last written.
    pub updated_at: DateTime<Utc>,

    /// Incremented on every write.
    pub version: u64,
}

/// Result of a debounced checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Checkpoint {
    /// Pending gold was settled.
    Saved {
        /// Amount settled, in hundredths.
        settled: u64,
    },
    /// The account was written too recently.
    Skipped {
        /// Seconds until the next checkpoint is accepted.
        retry_in_seconds: i64,
    },
}

impl MinerAccount {
    /// Create an empty, unverified account.
    #[must_use]
    pub fn new(wallet: StakeAddress, now: DateTime<Utc>) -> Self {
        Self {
            wallet,
            company_name: None,
            accumulated_gold: 0,
            total_cumulative_gold: 0,
            gold_spent: 0,
            gold_per_hour: 0,
            owned_meks: Vec::new(),
            is_blockchain_verified: false,
            last_gold_collection: now,
            last_active_time: now,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Gold accrued since the last settlement.
    #[must_use]
    pub fn pending_gold(&self, now: DateTime<Utc>, cap: AccrualCap) -> u64 {
        if !self.is_blockchain_verified {
            return 0;
        }
        accrual::pending(self.gold_per_hour, self.last_gold_collection, now, cap)
    }

    /// Settled plus pending gold.
    #[must_use]
    pub fn current_gold(&self, now: DateTime<Utc>, cap: AccrualCap) -> u64 {
        self.accumulated_gold
            .saturating_add(self.pending_gold(now, cap))
    }

    /// Cumulative plus pending gold, the leaderboard metric.
    #[must_use]
    pub fn cumulative_gold(&self, now: DateTime<Utc>, cap: AccrualCap) -> u64 {
        self.total_cumulative_gold
            .saturating_add(self.pending_gold(now, cap))
    }

    /// Number of Meks owned.
    #[must_use]
    pub fn mek_count(&self) -> usize {
        self.owned_meks.len()
    }

    /// Settle pending gold into the stored amounts and return it.
    pub fn collect(&mut self, now: DateTime<Utc>, cap: AccrualCap) -> u64 {
        let earned = self.settle(now, cap);
        self.last_active_time = now;
        self.touch(now);
        earned
    }

    /// Settle pending gold unless the account was written in the last
    /// `debounce`.
    pub fn checkpoint(
        &mut self,
        now: DateTime<Utc>,
        cap: AccrualCap,
        debounce: Duration,
    ) -> Checkpoint {
        let since_write = now - self.updated_at;
        if since_write < debounce && since_write >= Duration::zero() {
            return Checkpoint::Skipped {
                retry_in_seconds: (debounce - since_write).num_seconds().max(1),
            };
        }
        let settled = self.settle(now, cap);
        self.touch(now);
        Checkpoint::Saved { settled }
    }

    /// Remove gold from the settled balance.
    ///
    /// Pending gold is settled first so that it can be spent.
    ///
    /// # Errors
    ///
    /// Returns [`TycoonError::InvalidAmount`] for zero and
    /// [`TycoonError::InsufficientGold`] when the balance is short.
    pub fn spend_gold(&mut self, amount: u64, now: DateTime<Utc>, cap: AccrualCap) -> Result<u64> {
        if amount == 0 {
            return Err(TycoonError::InvalidAmount(
                "spend amount must be positive".to_string(),
            ));
        }
        self.settle(now, cap);
        if self.accumulated_gold < amount {
            return Err(TycoonError::InsufficientGold {
                available: self.accumulated_gold,
                required: amount,
            });
        }
        self.accumulated_gold -= amount;
        self.gold_spent = self.gold_spent.saturating_add(amount);
        self.last_active_time = now;
        self.touch(now);
        Ok(self.accumulated_gold)
    }

    /// Install a fresh on-chain ownership snapshot.
    ///
    /// Gold earned so far is settled at the old rate before the new rate
    /// takes effect. Returns the settled amount.
    pub fn apply_verification(
        &mut self,
        meks: Vec<OwnedMek>,
        now: DateTime<Utc>,
        cap: AccrualCap,
    ) -> u64 {
        let settled = self.settle(now, cap);
        self.gold_per_hour = meks
            .iter()
            .fold(0u64, |total, mek| total.saturating_add(mek.gold_per_hour));
        self.owned_meks = meks;
        self.is_blockchain_verified = true;
        self.touch(now);
        settled
    }

    /// Stop accrual until the wallet is verified again.
    pub fn reset_verification(&mut self, now: DateTime<Utc>, cap: AccrualCap) {
        self.settle(now, cap);
        self.is_blockchain_verified = false;
        self.touch(now);
    }

    /// Record a player action without settling gold.
    pub fn mark_active(&mut self, now: DateTime<Utc>) {
        self.last_active_time = now;
        self.touch(now);
    }

    /// Set the company name, already validated.
    pub fn set_company_name(&mut self, name: String, now: DateTime<Utc>) {
        self.company_name = Some(name);
        self.touch(now);
    }

    /// Name shown on the leaderboard.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.company_name
            .clone()
            .unwrap_or_else(|| self.wallet.short())
    }

    fn settle(&mut self, now: DateTime<Utc>, cap: AccrualCap) -> u64 {
        let earned = self.pending_gold(now, cap);
        self.accumulated_gold = self.accumulated_gold.saturating_add(earned);
        self.total_cumulative_gold = self.total_cumulative_gold.saturating_add(earned);
        if now > self.last_gold_collection {
            self.last_gold_collection = now;
        }
        earned
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}

/// Validate a company name and return it trimmed.
///
/// # Errors
///
/// Returns [`TycoonError::InvalidCompanyName`] when the trimmed name is not
/// 2 to 30 letters, digits and spaces, or contains a blocked word.
pub fn validate_company_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < COMPANY_NAME_MIN_LEN {
        return Err(TycoonError::InvalidCompanyName(format!(
            "must be at least {COMPANY_NAME_MIN_LEN} characters"
        )));
    }
    if len > COMPANY_NAME_MAX_LEN {
        return Err(TycoonError::InvalidCompanyName(format!(
            "must be at most {COMPANY_NAME_MAX_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace())
    {
        return Err(TycoonError::InvalidCompanyName(
            "only letters, numbers and spaces are allowed".to_string(),
        ));
    }
    let lower = name.to_ascii_lowercase();
    if lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| BLOCKED_WORDS.contains(&token))
    {
        return Err(TycoonError::InvalidCompanyName(
            "contains inappropriate content".to_string(),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> StakeAddress {
        "stake1u8pcjgmx7962w6hey5hhsd502araxp26kdtgagakhaqtq8squng76"
            .parse()
            .unwrap()
    }

    fn mek(number: u16, rate: u64) -> OwnedMek {
        OwnedMek {
            mek_number: MekNumber::new(number).unwrap(),
            asset_id: format!("policy{number}"),
            source_key: None,
            gold_per_hour: rate,
        }
    }

    fn verified(now: DateTime<Utc>) -> MinerAccount {
        let mut account = MinerAccount::new(wallet(), now);
        account.apply_verification(vec![mek(1, 10_000), mek(4000, 1_000)], now, AccrualCap::default());
        account
    }

    #[test]
    fn unverified_accounts_do_not_accrue() {
        let start = Utc::now();
        let mut account = MinerAccount::new(wallet(), start);
        account.gold_per_hour = 10_000;
        let later = start + Duration::hours(5);
        assert_eq!(account.pending_gold(later, AccrualCap::default()), 0);
        assert_eq!(account.collect(later, AccrualCap::default()), 0);
        assert_eq!(account.last_gold_collection, later);
    }

    #[test]
    fn collect_settles_and_resets_pending() {
        let start = Utc::now();
        let mut account = verified(start);
        assert_eq!(account.gold_per_hour, 11_000);

        let later = start + Duration::hours(2);
        assert_eq!(account.collect(later, AccrualCap::default()), 22_000);
        assert_eq!(account.accumulated_gold, 22_000);
        assert_eq!(account.total_cumulative_gold, 22_000);
        assert_eq!(account.pending_gold(later, AccrualCap::default()), 0);
        assert_eq!(account.collect(later, AccrualCap::default()), 0);
    }

    #[test]
    fn collect_respects_cap() {
        let start = Utc::now();
        let mut account = verified(start);
        let later = start + Duration::hours(200);
        assert_eq!(account.collect(later, AccrualCap::Hours(72)), 11_000 * 72);
    }

    #[test]
    fn checkpoint_is_debounced() {
        let start = Utc::now();
        let mut account = verified(start);
        let debounce = Duration::seconds(CHECKPOINT_DEBOUNCE_SECONDS);

        let soon = start + Duration::seconds(10);
        assert_eq!(
            account.checkpoint(soon, AccrualCap::default(), debounce),
            Checkpoint::Skipped { retry_in_seconds: 20 }
        );

        let later = start + Duration::hours(1);
        assert_eq!(
            account.checkpoint(later, AccrualCap::default(), debounce),
            Checkpoint::Saved { settled: 11_000 }
        );
    }

    #[test]
    fn spend_keeps_cumulative() {
        let start = Utc::now();
        let mut account = verified(start);
        let later = start + Duration::hours(1);

        assert_eq!(account.spend_gold(1_000, later, AccrualCap::default()).unwrap(), 10_000);
        assert_eq!(account.total_cumulative_gold, 11_000);
        assert_eq!(account.gold_spent, 1_000);

        let err = account
            .spend_gold(50_000, later, AccrualCap::default())
            .unwrap_err();
        assert_eq!(
            err,
            TycoonError::InsufficientGold {
                available: 10_000,
                required: 50_000
            }
        );
        assert!(account.spend_gold(0, later, AccrualCap::default()).is_err());
    }

    #[test]
    fn verification_settles_old_rate_first() {
        let start = Utc::now();
        let mut account = verified(start);
        let later = start + Duration::hours(1);

        let settled = account.apply_verification(vec![mek(2, 500)], later, AccrualCap::default());
        assert_eq!(settled, 11_000);
        assert_eq!(account.gold_per_hour, 500);
        assert_eq!(account.mek_count(), 1);

        let after = later + Duration::hours(2);
        assert_eq!(account.pending_gold(after, AccrualCap::default()), 1_000);
    }

    #[test]
    fn every_write_bumps_version() {
        let start = Utc::now();
        let mut account = MinerAccount::new(wallet(), start);
        account.collect(start, AccrualCap::default());
        account.mark_active(start);
        assert_eq!(account.version, 2);
    }

    #[test]
    fn display_name_falls_back_to_short_wallet() {
        let mut account = MinerAccount::new(wallet(), Utc::now());
        assert_eq!(account.display_name(), "stake1u8...qung76");
        account.set_company_name("Rust Mining Co".to_string(), Utc::now());
        assert_eq!(account.display_name(), "Rust Mining Co");
    }

    #[test]
    fn company_name_rules() {
        assert_eq!(validate_company_name("  Mek Works 42 ").unwrap(), "Mek Works 42");
        assert!(validate_company_name("a").is_err());
        assert!(validate_company_name(&"x".repeat(31)).is_err());
        assert!(validate_company_name("Mek-Works").is_err());
        assert!(validate_company_name("Crap Mining").is_err());
    }

    #[test]
    fn blocked_words_match_whole_words_only() {
        for name in ["Shell Corp", "First Class", "Hello Mining", "Passive Assets"] {
            assert_eq!(validate_company_name(name).unwrap(), name);
        }
        assert!(validate_company_name("Hell Mining").is_err());
        assert!(validate_company_name("big  DAMN  works").is_err());
    }
}
