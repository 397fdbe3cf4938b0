//! `RocksDB` storage layer for Mek Tycoon.
//!
//! This crate persists accounts, Meks, the leaderboard snapshot, campaign
//! books and wallet auth records using `RocksDB` column families.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `accounts`: Miner accounts, keyed by stake address
//! - `meks`: Mek records, keyed by Mek number
//! - `meks_by_owner`: Index for listing Meks by owner
//! - `leaderboard`: Ranked snapshot, keyed by category and rank
//! - `campaigns`: Campaign books, keyed by campaign id
//! - `reservations`: Index from reservation id to campaign id
//! - `settings`, `tenure_buffs`: Tenure and gold rate configuration
//! - `auth_nonces`, `auth_attempts`: Wallet authentication state
//! - `essence`: Essence slots, balances and buffs per wallet
//!
//! # Atomic updates
//!
//! Every `update_*` method runs read, closure and write under one store-wide
//! write lock, and commits with a single `WriteBatch`. Two concurrent gold
//! collections for a wallet are therefore serialized and the second one sees
//! nothing pending. If the closure returns an error nothing is written.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use mek_tycoon_core::{AccrualCap, StakeAddress};
//! use mek_tycoon_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/mek-tycoon-db").unwrap();
//! let wallet: StakeAddress = "stake1u8pcjgmx7962w6hey5hhsd502araxp26kdtgagakhaqtq8squng76"
//!     .parse()
//!     .unwrap();
//!
//! let (_account, _created) = store.get_or_create_account(&wallet, Utc::now()).unwrap();
//! let collected = store
//!     .update_account(&wallet, |account| Ok(account.collect(Utc::now(), AccrualCap::default())))
//!     .unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mek_tycoon_core::{
    AccrualCap, AuthAttempts, BuffId, CampaignBook, CampaignId, EssenceConfig, EssenceState,
    GoldRateCurve,
    LeaderboardCategory, LeaderboardEntry, MekNumber, MekRecord, MinerAccount, NonceChallenge,
    OwnedMek, ReservationId, StakeAddress, TenureBuff, TenureSettings,
};

/// Authentication state of one wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Outstanding nonce, if any.
    pub nonce: Option<NonceChallenge>,
    /// Failed attempts and lockout.
    pub attempts: AuthAttempts,
}

/// Counts returned by an auth record purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthPurge {
    /// Expired or used nonces removed.
    pub nonces: usize,
    /// Stale attempt records removed.
    pub attempts: usize,
}

/// The storage trait defining all database operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or replace an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &MinerAccount) -> Result<()>;

    /// Get an account by stake address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, wallet: &StakeAddress) -> Result<Option<MinerAccount>>;

    /// Return the account, creating an empty one on first connect.
    /// The flag is `true` when the account was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_or_create_account(
        &self,
        wallet: &StakeAddress,
        now: DateTime<Utc>,
    ) -> Result<(MinerAccount, bool)>;

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn delete_account(&self, wallet: &StakeAddress) -> Result<()>;

    /// Every readable account. Rows that fail to decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_accounts(&self) -> Result<Vec<MinerAccount>>;

    /// Atomically read, modify and write an account.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::Domain` if the closure rejects the change.
    fn update_account<T, F>(&self, wallet: &StakeAddress, f: F) -> Result<T>
    where
        F: FnOnce(&mut MinerAccount) -> mek_tycoon_core::Result<T>;

    /// Set a company name that no other account uses (case-insensitive).
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::Domain` with `CompanyNameTaken` if the name is in use.
    fn set_company_name(
        &self,
        wallet: &StakeAddress,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<MinerAccount>;

    /// Install an on-chain ownership snapshot: settle gold, replace owned
    /// Meks, mark verified, and move Mek records to this owner. Meks the
    /// wallet no longer holds lose their owner.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn apply_verification(
        &self,
        wallet: &StakeAddress,
        meks: Vec<OwnedMek>,
        gold_cap: AccrualCap,
        tenure_cap: AccrualCap,
        now: DateTime<Utc>,
    ) -> Result<MinerAccount>;

    /// Delete account rows whose key is not a valid stake address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_invalid_wallet_accounts(&self) -> Result<usize>;

    /// Delete accounts that own no Meks.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_zero_mek_accounts(&self) -> Result<Vec<StakeAddress>>;

    // =========================================================================
    // Mek Operations
    // =========================================================================

    /// Insert or replace a Mek record, maintaining the owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_mek(&self, mek: &MekRecord) -> Result<()>;

    /// Get a Mek record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_mek(&self, mek: MekNumber) -> Result<Option<MekRecord>>;

    /// Meks owned by a wallet, ordered by Mek number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_meks_by_owner(&self, wallet: &StakeAddress) -> Result<Vec<MekRecord>>;

    /// Atomically read, modify and write all Meks of one owner.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Domain` if the closure rejects the change.
    fn update_owner_meks<T, F>(&self, wallet: &StakeAddress, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<MekRecord>) -> mek_tycoon_core::Result<T>;

    /// Settle every slotted Mek and continue at the rate `rate_for` gives.
    /// Returns the number of Meks re-rated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn rerate_slotted_meks<F>(&self, cap: AccrualCap, now: DateTime<Utc>, rate_for: F) -> Result<usize>
    where
        F: Fn(&MekRecord) -> u64;

    // =========================================================================
    // Tenure and Gold Rate Configuration
    // =========================================================================

    /// Current tenure settings, or the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_tenure_settings(&self) -> Result<TenureSettings>;

    /// Replace the tenure settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_tenure_settings(&self, settings: &TenureSettings) -> Result<()>;

    /// Every tenure buff.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_buffs(&self) -> Result<Vec<TenureBuff>>;

    /// Insert or replace a tenure buff.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_buff(&self, buff: &TenureBuff) -> Result<()>;

    /// Delete a tenure buff.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the buff doesn't exist.
    fn delete_buff(&self, id: &BuffId) -> Result<()>;

    /// Configured gold rate curve, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_gold_rate_curve(&self) -> Result<Option<GoldRateCurve>>;

    /// Replace the gold rate curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_gold_rate_curve(&self, curve: &GoldRateCurve) -> Result<()>;

    // =========================================================================
    // Leaderboard Operations
    // =========================================================================

    /// Replace one category's snapshot in a single write.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn replace_leaderboard(
        &self,
        category: LeaderboardCategory,
        entries: &[LeaderboardEntry],
    ) -> Result<()>;

    /// Top `limit` entries of a category, in rank order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>>;

    /// Delete every cached entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clear_leaderboard(&self) -> Result<usize>;

    // =========================================================================
    // Campaign Operations
    // =========================================================================

    /// Insert a new campaign book.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_campaign(&self, book: &CampaignBook) -> Result<()>;

    /// Get a campaign book.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_campaign(&self, id: &CampaignId) -> Result<Option<CampaignBook>>;

    /// Every campaign book.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_campaigns(&self) -> Result<Vec<CampaignBook>>;

    /// Atomically read, modify and write a campaign book.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the campaign doesn't exist.
    /// - `StoreError::Domain` if the closure rejects the change.
    fn update_campaign<T, F>(&self, id: &CampaignId, f: F) -> Result<T>
    where
        F: FnOnce(&mut CampaignBook) -> mek_tycoon_core::Result<T>;

    /// Campaign that holds a reservation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn campaign_for_reservation(&self, id: &ReservationId) -> Result<Option<CampaignId>>;

    // =========================================================================
    // Essence Operations
    // =========================================================================

    /// Current essence configuration, or the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_essence_config(&self) -> Result<EssenceConfig>;

    /// Replace the essence configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_essence_config(&self, config: &EssenceConfig) -> Result<()>;

    /// A wallet's essence state, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_essence_state(&self, wallet: &StakeAddress) -> Result<Option<EssenceState>>;

    /// Atomically read, modify and write a wallet's essence state together
    /// with its account. The state is created from `config` on first use.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::Domain` if the closure rejects the change.
    fn update_essence<T, F>(
        &self,
        wallet: &StakeAddress,
        config: &EssenceConfig,
        now: DateTime<Utc>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut EssenceState, &mut MinerAccount) -> mek_tycoon_core::Result<T>;

    /// Settle every active essence state and stamp the daily checkpoint.
    /// Returns the number of wallets updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn checkpoint_essence(&self, config: &EssenceConfig, now: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Wallet Auth Operations
    // =========================================================================

    /// Auth state of a wallet (empty if none stored).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_auth_state(&self, wallet: &StakeAddress) -> Result<AuthState>;

    /// Atomically read, modify and write a wallet's auth state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Domain` if the closure rejects the change.
    fn update_auth_state<T, F>(&self, wallet: &StakeAddress, f: F) -> Result<T>
    where
        F: FnOnce(&mut AuthState) -> mek_tycoon_core::Result<T>;

    /// Remove expired or used nonces and stale attempt records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_auth_records(&self, now: DateTime<Utc>) -> Result<AuthPurge>;
}
