//! Leaderboard ranking.
//!
//! The leaderboard is a derived snapshot: a refresh ranks every verified
//! account by a category metric and the result replaces the cached table.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accrual::AccrualCap;
use crate::account::MinerAccount;
use crate::ids::StakeAddress;

/// Entries returned when no limit is given.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Largest page a reader may ask for.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// A ranking category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardCategory {
    /// Cumulative gold, including pending.
    Gold,
    /// Owned Mek count.
    Meks,
    /// Gold per hour.
    GoldRate,
}

impl LeaderboardCategory {
    /// Every category, in refresh order.
    pub const ALL: [Self; 3] = [Self::Gold, Self::Meks, Self::GoldRate];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Meks => "meks",
            Self::GoldRate => "gold_rate",
        }
    }

    /// One-byte tag used as a storage key prefix.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Gold => 1,
            Self::Meks => 2,
            Self::GoldRate => 3,
        }
    }

    /// Metric of `account` for this category at `now`.
    #[must_use]
    pub fn metric(self, account: &MinerAccount, now: DateTime<Utc>, cap: AccrualCap) -> u64 {
        match self {
            Self::Gold => account.cumulative_gold(now, cap),
            Self::Meks => account.mek_count() as u64,
            Self::GoldRate => account.gold_per_hour,
        }
    }
}

impl fmt::Display for LeaderboardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gold" => Ok(Self::Gold),
            "meks" => Ok(Self::Meks),
            "gold_rate" => Ok(Self::GoldRate),
            other => Err(format!("unknown leaderboard category: {other}")),
        }
    }
}

/// One cached leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Category ranked.
    pub category: LeaderboardCategory,
    /// 1-based position.
    pub rank: u32,
    /// Wallet of the account.
    pub wallet: StakeAddress,
    /// Company name or shortened wallet.
    pub display_name: String,
    /// Metric value at refresh time.
    pub value: u64,
    /// Gold rate at refresh time.
    pub gold_per_hour: u64,
    /// Mek count at refresh time.
    pub mek_count: u32,
    /// When the snapshot was taken.
    pub refreshed_at: DateTime<Utc>,
}

/// Rank verified accounts for `category`.
///
/// Sorted by metric descending, ties by wallet ascending.
#[must_use]
pub fn compute_rankings(
    accounts: &[MinerAccount],
    category: LeaderboardCategory,
    now: DateTime<Utc>,
    cap: AccrualCap,
) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(u64, &MinerAccount)> = accounts
        .iter()
        .filter(|account| account.is_blockchain_verified)
        .map(|account| (category.metric(account, now, cap), account))
        .collect();
    scored.sort_by(|(a_value, a), (b_value, b)| {
        b_value.cmp(a_value).then_with(|| a.wallet.cmp(&b.wallet))
    });

    scored
        .into_iter()
        .zip(1u32..)
        .map(|((value, account), rank)| LeaderboardEntry {
            category,
            rank,
            wallet: account.wallet.clone(),
            display_name: account.display_name(),
            value,
            gold_per_hour: account.gold_per_hour,
            mek_count: u32::try_from(account.mek_count()).unwrap_or(u32::MAX),
            refreshed_at: now,
        })
        .collect()
}

/// Clamp a requested page size to `1..=100`, defaulting to 10.
#[must_use]
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::OwnedMek;
    use crate::ids::MekNumber;
    use chrono::Duration;

    fn wallet(fill: char) -> StakeAddress {
        format!("stake1{}", fill.to_string().repeat(53)).parse().unwrap()
    }

    fn account(fill: char, meks: u16, rate_each: u64, start: DateTime<Utc>) -> MinerAccount {
        let mut account = MinerAccount::new(wallet(fill), start);
        let owned = (1..=meks)
            .map(|n| OwnedMek {
                mek_number: MekNumber::new(n).unwrap(),
                asset_id: format!("asset{n}"),
                source_key: None,
                gold_per_hour: rate_each,
            })
            .collect();
        account.apply_verification(owned, start, AccrualCap::default());
        account
    }

    #[test]
    fn ranks_by_metric_descending() {
        let start = Utc::now();
        let accounts = vec![
            account('a', 1, 1_000, start),
            account('b', 3, 1_000, start),
            account('c', 2, 1_000, start),
        ];
        let now = start + Duration::hours(1);
        let ranked = compute_rankings(&accounts, LeaderboardCategory::Gold, now, AccrualCap::default());
        let order: Vec<(u32, u64)> = ranked.iter().map(|e| (e.rank, e.value)).collect();
        assert_eq!(order, vec![(1, 3_000), (2, 2_000), (3, 1_000)]);
        assert_eq!(ranked[0].wallet, wallet('b'));
    }

    #[test]
    fn ties_break_by_wallet() {
        let start = Utc::now();
        let accounts = vec![account('z', 2, 100, start), account('d', 2, 100, start)];
        let ranked = compute_rankings(&accounts, LeaderboardCategory::Meks, start, AccrualCap::default());
        assert_eq!(ranked[0].wallet, wallet('d'));
        assert_eq!(ranked[1].wallet, wallet('z'));
        assert_eq!(ranked[0].value, 2);
    }

    #[test]
    fn unverified_accounts_are_excluded() {
        let start = Utc::now();
        let mut hidden = account('h', 5, 1_000, start);
        hidden.is_blockchain_verified = false;
        let accounts = vec![hidden, account('v', 1, 1_000, start)];
        let ranked = compute_rankings(&accounts, LeaderboardCategory::GoldRate, start, AccrualCap::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].wallet, wallet('v'));
    }

    #[test]
    fn category_parsing_and_limits() {
        assert_eq!("gold_rate".parse::<LeaderboardCategory>(), Ok(LeaderboardCategory::GoldRate));
        assert!("essence".parse::<LeaderboardCategory>().is_err());
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 100);
    }
}
