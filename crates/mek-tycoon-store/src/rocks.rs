//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use mek_tycoon_core::{
    is_valid_stake_address, AccrualCap, BuffId, CampaignBook, CampaignId, GoldRateCurve,
    LeaderboardCategory, LeaderboardEntry, MekNumber, MekRecord, MinerAccount, OwnedMek,
    ReservationId, StakeAddress, TenureBuff, TenureSettings, TycoonError,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf, settings};
use crate::{AuthPurge, AuthState, Store};

type KeyValue = (Box<[u8]>, Box<[u8]>);

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Take the store-wide write lock.
    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".to_string()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(name)?;
        let value = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// All key/value pairs whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, name: &str, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        let cf = self.cf(name)?;
        let mut out = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key, value));
        }
        Ok(out)
    }

    /// Decode every value in a column family, skipping rows that fail.
    fn scan_values<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let rows = self.scan_prefix(name, &[])?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| match Self::deserialize(&value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!(
                        column_family = name,
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping undecodable row"
                    );
                    None
                }
            })
            .collect())
    }

    fn load_account(&self, wallet: &StakeAddress) -> Result<MinerAccount> {
        self.get_value(cf::ACCOUNTS, &keys::account_key(wallet))?
            .ok_or_else(|| StoreError::not_found("account", wallet))
    }

    fn owner_meks(&self, wallet: &StakeAddress) -> Result<Vec<MekRecord>> {
        let index = self.scan_prefix(cf::MEKS_BY_OWNER, &keys::owner_prefix(wallet))?;
        let mut meks = Vec::with_capacity(index.len());
        for (key, _) in index {
            let Some(number) = keys::extract_mek_from_owner_key(&key) else {
                continue;
            };
            if let Some(mek) = self.get_value::<MekRecord>(cf::MEKS, &keys::mek_key(number))? {
                meks.push(mek);
            }
        }
        Ok(meks)
    }

    /// Add a Mek write to `batch`, moving its owner index entry if needed.
    fn stage_mek(
        &self,
        batch: &mut WriteBatch,
        mek: &MekRecord,
        previous_owner: Option<&StakeAddress>,
    ) -> Result<()> {
        let cf_meks = self.cf(cf::MEKS)?;
        let cf_index = self.cf(cf::MEKS_BY_OWNER)?;
        if let Some(previous) = previous_owner {
            if mek.owner.as_ref() != Some(previous) {
                batch.delete_cf(&cf_index, keys::owner_mek_key(previous, mek.mek_number));
            }
        }
        if let Some(owner) = &mek.owner {
            batch.put_cf(&cf_index, keys::owner_mek_key(owner, mek.mek_number), b"");
        }
        batch.put_cf(&cf_meks, keys::mek_key(mek.mek_number), Self::serialize(mek)?);
        Ok(())
    }

    /// Stage a campaign book and its reservation index. Index entries for
    /// reservations in `previous` that `book` no longer holds are deleted.
    fn stage_campaign(
        &self,
        batch: &mut WriteBatch,
        book: &CampaignBook,
        previous: &[ReservationId],
    ) -> Result<()> {
        let cf_campaigns = self.cf(cf::CAMPAIGNS)?;
        let cf_reservations = self.cf(cf::RESERVATIONS)?;
        let campaign_key = keys::campaign_key(&book.campaign.id);
        for stale in previous.iter().filter(|id| book.reservation(**id).is_none()) {
            batch.delete_cf(&cf_reservations, keys::reservation_key(stale));
        }
        for reservation in &book.reservations {
            batch.put_cf(
                &cf_reservations,
                keys::reservation_key(&reservation.id),
                &campaign_key,
            );
        }
        batch.put_cf(&cf_campaigns, &campaign_key, Self::serialize(book)?);
        Ok(())
    }

    fn load_auth_state(&self, wallet: &StakeAddress) -> Result<AuthState> {
        let key = keys::account_key(wallet);
        Ok(AuthState {
            nonce: self.get_value(cf::AUTH_NONCES, &key)?,
            attempts: self
                .get_value(cf::AUTH_ATTEMPTS, &key)?
                .unwrap_or_default(),
        })
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn put_account(&self, account: &MinerAccount) -> Result<()> {
        self.put_value(cf::ACCOUNTS, &keys::account_key(&account.wallet), account)
    }

    fn get_account(&self, wallet: &StakeAddress) -> Result<Option<MinerAccount>> {
        self.get_value(cf::ACCOUNTS, &keys::account_key(wallet))
    }

    fn get_or_create_account(
        &self,
        wallet: &StakeAddress,
        now: DateTime<Utc>,
    ) -> Result<(MinerAccount, bool)> {
        let _guard = self.lock()?;
        if let Some(account) = self.get_account(wallet)? {
            return Ok((account, false));
        }
        let account = MinerAccount::new(wallet.clone(), now);
        self.put_account(&account)?;
        tracing::info!(wallet = %wallet, "Created miner account");
        Ok((account, true))
    }

    fn delete_account(&self, wallet: &StakeAddress) -> Result<()> {
        let _guard = self.lock()?;
        let key = keys::account_key(wallet);

        // Check if account exists
        if self.get_account(wallet)?.is_none() {
            return Err(StoreError::not_found("account", wallet));
        }

        let mut batch = WriteBatch::default();
        batch.delete_cf(&self.cf(cf::ACCOUNTS)?, &key);
        batch.delete_cf(&self.cf(cf::ESSENCE)?, &key);
        self.write(batch)
    }

    fn list_accounts(&self) -> Result<Vec<MinerAccount>> {
        self.scan_values(cf::ACCOUNTS)
    }

    fn update_account<T, F>(&self, wallet: &StakeAddress, f: F) -> Result<T>
    where
        F: FnOnce(&mut MinerAccount) -> mek_tycoon_core::Result<T>,
    {
        let _guard = self.lock()?;
        let mut account = self.load_account(wallet)?;
        let out = f(&mut account)?;
        self.put_account(&account)?;
        Ok(out)
    }

    fn set_company_name(
        &self,
        wallet: &StakeAddress,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<MinerAccount> {
        let _guard = self.lock()?;
        let mut account = self.load_account(wallet)?;

        let wanted = name.to_lowercase();
        let taken = self.list_accounts()?.into_iter().any(|other| {
            &other.wallet != wallet
                && other
                    .company_name
                    .as_deref()
                    .is_some_and(|existing| existing.to_lowercase() == wanted)
        });
        if taken {
            return Err(TycoonError::CompanyNameTaken(name.to_string()).into());
        }

        account.set_company_name(name.to_string(), now);
        self.put_account(&account)?;
        Ok(account)
    }

    fn apply_verification(
        &self,
        wallet: &StakeAddress,
        meks: Vec<OwnedMek>,
        gold_cap: AccrualCap,
        tenure_cap: AccrualCap,
        now: DateTime<Utc>,
    ) -> Result<MinerAccount> {
        let _guard = self.lock()?;
        let mut account = self.load_account(wallet)?;
        let mut batch = WriteBatch::default();

        let held: BTreeSet<MekNumber> = meks.iter().map(|m| m.mek_number).collect();
        for mut dropped in self.owner_meks(wallet)? {
            if !held.contains(&dropped.mek_number) {
                dropped.clear_owner(tenure_cap, now);
                self.stage_mek(&mut batch, &dropped, Some(wallet))?;
            }
        }

        for owned in &meks {
            let existing: Option<MekRecord> =
                self.get_value(cf::MEKS, &keys::mek_key(owned.mek_number))?;
            let previous_owner = existing.as_ref().and_then(|m| m.owner.clone());
            let mut record = existing.unwrap_or_else(|| {
                MekRecord::new(owned.mek_number, owned.asset_id.clone(), None, now)
            });
            record.asset_id.clone_from(&owned.asset_id);
            if owned.source_key.is_some() {
                record.source_key.clone_from(&owned.source_key);
            }
            record.transfer_to(wallet.clone(), tenure_cap, now);
            self.stage_mek(&mut batch, &record, previous_owner.as_ref())?;
        }

        let settled = account.apply_verification(meks, now, gold_cap);
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        batch.put_cf(&cf_accounts, keys::account_key(wallet), Self::serialize(&account)?);
        self.write(batch)?;

        tracing::info!(
            wallet = %wallet,
            mek_count = account.mek_count(),
            gold_per_hour = account.gold_per_hour,
            settled,
            "Applied ownership verification"
        );
        Ok(account)
    }

    fn delete_invalid_wallet_accounts(&self) -> Result<usize> {
        let _guard = self.lock()?;
        let cf = self.cf(cf::ACCOUNTS)?;
        let mut batch = WriteBatch::default();
        let mut deleted = 0;
        for (key, _) in self.scan_prefix(cf::ACCOUNTS, &[])? {
            let valid = std::str::from_utf8(&key).is_ok_and(is_valid_stake_address);
            if !valid {
                batch.delete_cf(&cf, &key);
                deleted += 1;
            }
        }
        self.write(batch)?;
        Ok(deleted)
    }

    fn delete_zero_mek_accounts(&self) -> Result<Vec<StakeAddress>> {
        let _guard = self.lock()?;
        let cf = self.cf(cf::ACCOUNTS)?;
        let cf_essence = self.cf(cf::ESSENCE)?;
        let mut batch = WriteBatch::default();
        let mut deleted = Vec::new();
        for account in self.list_accounts()? {
            if account.owned_meks.is_empty() {
                let key = keys::account_key(&account.wallet);
                batch.delete_cf(&cf, &key);
                batch.delete_cf(&cf_essence, &key);
                deleted.push(account.wallet);
            }
        }
        self.write(batch)?;
        Ok(deleted)
    }

    // =========================================================================
    // Mek Operations
    // =========================================================================

    fn put_mek(&self, mek: &MekRecord) -> Result<()> {
        let _guard = self.lock()?;
        let previous = self.get_mek(mek.mek_number)?.and_then(|m| m.owner);
        let mut batch = WriteBatch::default();
        self.stage_mek(&mut batch, mek, previous.as_ref())?;
        self.write(batch)
    }

    fn get_mek(&self, mek: MekNumber) -> Result<Option<MekRecord>> {
        self.get_value(cf::MEKS, &keys::mek_key(mek))
    }

    fn list_meks_by_owner(&self, wallet: &StakeAddress) -> Result<Vec<MekRecord>> {
        self.owner_meks(wallet)
    }

    fn update_owner_meks<T, F>(&self, wallet: &StakeAddress, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<MekRecord>) -> mek_tycoon_core::Result<T>,
    {
        let _guard = self.lock()?;
        let mut meks = self.owner_meks(wallet)?;
        let out = f(&mut meks)?;
        let mut batch = WriteBatch::default();
        for mek in &meks {
            self.stage_mek(&mut batch, mek, Some(wallet))?;
        }
        self.write(batch)?;
        Ok(out)
    }

    fn rerate_slotted_meks<F>(&self, cap: AccrualCap, now: DateTime<Utc>, rate_for: F) -> Result<usize>
    where
        F: Fn(&MekRecord) -> u64,
    {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();
        let mut rerated = 0;
        for mut mek in self.scan_values::<MekRecord>(cf::MEKS)? {
            if !mek.is_slotted {
                continue;
            }
            let rate = rate_for(&mek);
            mek.rerate(rate, cap, now);
            let owner = mek.owner.clone();
            self.stage_mek(&mut batch, &mek, owner.as_ref())?;
            rerated += 1;
        }
        self.write(batch)?;
        Ok(rerated)
    }

    // =========================================================================
    // Tenure and Gold Rate Configuration
    // =========================================================================

    fn get_tenure_settings(&self) -> Result<TenureSettings> {
        Ok(self
            .get_value(cf::SETTINGS, settings::TENURE.as_bytes())?
            .unwrap_or_default())
    }

    fn put_tenure_settings(&self, tenure: &TenureSettings) -> Result<()> {
        let _guard = self.lock()?;
        self.put_value(cf::SETTINGS, settings::TENURE.as_bytes(), tenure)
    }

    fn list_buffs(&self) -> Result<Vec<TenureBuff>> {
        self.scan_values(cf::TENURE_BUFFS)
    }

    fn put_buff(&self, buff: &TenureBuff) -> Result<()> {
        let _guard = self.lock()?;
        self.put_value(cf::TENURE_BUFFS, &buff.id.to_bytes(), buff)
    }

    fn delete_buff(&self, id: &BuffId) -> Result<()> {
        let _guard = self.lock()?;
        let key = id.to_bytes();
        if self.get_value::<TenureBuff>(cf::TENURE_BUFFS, &key)?.is_none() {
            return Err(StoreError::not_found("buff", id));
        }
        let cf = self.cf(cf::TENURE_BUFFS)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_gold_rate_curve(&self) -> Result<Option<GoldRateCurve>> {
        self.get_value(cf::SETTINGS, settings::GOLD_RATE_CURVE.as_bytes())
    }

    fn put_gold_rate_curve(&self, curve: &GoldRateCurve) -> Result<()> {
        let _guard = self.lock()?;
        self.put_value(cf::SETTINGS, settings::GOLD_RATE_CURVE.as_bytes(), curve)
    }

    // =========================================================================
    // Leaderboard Operations
    // =========================================================================

    fn replace_leaderboard(
        &self,
        category: LeaderboardCategory,
        entries: &[LeaderboardEntry],
    ) -> Result<()> {
        let _guard = self.lock()?;
        let cf = self.cf(cf::LEADERBOARD)?;
        let mut batch = WriteBatch::default();
        batch.delete_range_cf(&cf, [category.tag()], [category.tag() + 1]);
        for entry in entries {
            batch.put_cf(
                &cf,
                keys::leaderboard_key(category, entry.rank),
                Self::serialize(entry)?,
            );
        }
        self.write(batch)
    }

    fn get_leaderboard(
        &self,
        category: LeaderboardCategory,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        let cf = self.cf(cf::LEADERBOARD)?;
        let prefix = keys::leaderboard_prefix(category);
        let mut entries = Vec::with_capacity(limit);
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            if entries.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push(Self::deserialize(&value)?);
        }
        Ok(entries)
    }

    fn clear_leaderboard(&self) -> Result<usize> {
        let _guard = self.lock()?;
        let cf = self.cf(cf::LEADERBOARD)?;
        let rows = self.scan_prefix(cf::LEADERBOARD, &[])?;
        let mut batch = WriteBatch::default();
        for (key, _) in &rows {
            batch.delete_cf(&cf, key);
        }
        self.write(batch)?;
        Ok(rows.len())
    }

    // =========================================================================
    // Campaign Operations
    // =========================================================================

    fn create_campaign(&self, book: &CampaignBook) -> Result<()> {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();
        self.stage_campaign(&mut batch, book, &[])?;
        self.write(batch)
    }

    fn get_campaign(&self, id: &CampaignId) -> Result<Option<CampaignBook>> {
        self.get_value(cf::CAMPAIGNS, &keys::campaign_key(id))
    }

    fn list_campaigns(&self) -> Result<Vec<CampaignBook>> {
        self.scan_values(cf::CAMPAIGNS)
    }

    fn update_campaign<T, F>(&self, id: &CampaignId, f: F) -> Result<T>
    where
        F: FnOnce(&mut CampaignBook) -> mek_tycoon_core::Result<T>,
    {
        let _guard = self.lock()?;
        let mut book = self
            .get_campaign(id)?
            .ok_or_else(|| StoreError::not_found("campaign", id))?;
        let previous: Vec<ReservationId> = book.reservations.iter().map(|r| r.id).collect();
        let out = f(&mut book)?;
        let mut batch = WriteBatch::default();
        self.stage_campaign(&mut batch, &book, &previous)?;
        self.write(batch)?;
        Ok(out)
    }

    fn campaign_for_reservation(&self, id: &ReservationId) -> Result<Option<CampaignId>> {
        let cf = self.cf(cf::RESERVATIONS)?;
        let value = self
            .db
            .get_cf(&cf, keys::reservation_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(value.and_then(|bytes| keys::campaign_id_from_bytes(&bytes)))
    }

    // =========================================================================
    // Essence Operations
    // =========================================================================

    fn get_essence_config(&self) -> Result<EssenceConfig> {
        Ok(self
            .get_value(cf::SETTINGS, settings::ESSENCE_CONFIG.as_bytes())?
            .unwrap_or_default())
    }

    fn put_essence_config(&self, config: &EssenceConfig) -> Result<()> {
        let _guard = self.lock()?;
        self.put_value(cf::SETTINGS, settings::ESSENCE_CONFIG.as_bytes(), config)
    }

    fn get_essence_state(&self, wallet: &StakeAddress) -> Result<Option<EssenceState>> {
        self.get_value(cf::ESSENCE, &keys::account_key(wallet))
    }

    fn update_essence<T, F>(
        &self,
        wallet: &StakeAddress,
        config: &EssenceConfig,
        now: DateTime<Utc>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut EssenceState, &mut MinerAccount) -> mek_tycoon_core::Result<T>,
    {
        let _guard = self.lock()?;
        let mut account = self.load_account(wallet)?;
        let mut state = self
            .get_essence_state(wallet)?
            .unwrap_or_else(|| EssenceState::new(wallet.clone(), config, now));
        let out = f(&mut state, &mut account)?;

        let key = keys::account_key(wallet);
        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(cf::ACCOUNTS)?, &key, Self::serialize(&account)?);
        batch.put_cf(&self.cf(cf::ESSENCE)?, &key, Self::serialize(&state)?);
        self.write(batch)?;
        Ok(out)
    }

    fn checkpoint_essence(&self, config: &EssenceConfig, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock()?;
        let cf = self.cf(cf::ESSENCE)?;
        let mut batch = WriteBatch::default();
        let mut updated = 0;
        for mut state in self.scan_values::<EssenceState>(cf::ESSENCE)? {
            if !state.is_active() {
                continue;
            }
            state.checkpoint(config, now);
            batch.put_cf(&cf, keys::account_key(&state.wallet), Self::serialize(&state)?);
            updated += 1;
        }
        self.write(batch)?;
        Ok(updated)
    }

    // =========================================================================
    // Wallet Auth Operations
    // =========================================================================

    fn get_auth_state(&self, wallet: &StakeAddress) -> Result<AuthState> {
        self.load_auth_state(wallet)
    }

    fn update_auth_state<T, F>(&self, wallet: &StakeAddress, f: F) -> Result<T>
    where
        F: FnOnce(&mut AuthState) -> mek_tycoon_core::Result<T>,
    {
        let _guard = self.lock()?;
        let mut state = self.load_auth_state(wallet)?;
        let out = f(&mut state)?;

        let key = keys::account_key(wallet);
        let cf_nonces = self.cf(cf::AUTH_NONCES)?;
        let cf_attempts = self.cf(cf::AUTH_ATTEMPTS)?;
        let mut batch = WriteBatch::default();
        match &state.nonce {
            Some(nonce) => batch.put_cf(&cf_nonces, &key, Self::serialize(nonce)?),
            None => batch.delete_cf(&cf_nonces, &key),
        }
        if state.attempts == mek_tycoon_core::AuthAttempts::default() {
            batch.delete_cf(&cf_attempts, &key);
        } else {
            batch.put_cf(&cf_attempts, &key, Self::serialize(&state.attempts)?);
        }
        self.write(batch)?;
        Ok(out)
    }

    fn purge_auth_records(&self, now: DateTime<Utc>) -> Result<AuthPurge> {
        let _guard = self.lock()?;
        let cf_nonces = self.cf(cf::AUTH_NONCES)?;
        let cf_attempts = self.cf(cf::AUTH_ATTEMPTS)?;
        let mut batch = WriteBatch::default();
        let mut purge = AuthPurge::default();

        for (key, value) in self.scan_prefix(cf::AUTH_NONCES, &[])? {
            let stale = Self::deserialize::<mek_tycoon_core::NonceChallenge>(&value)
                .map_or(true, |nonce| nonce.used_at.is_some() || nonce.expires_at < now);
            if stale {
                batch.delete_cf(&cf_nonces, &key);
                purge.nonces += 1;
            }
        }
        for (key, value) in self.scan_prefix(cf::AUTH_ATTEMPTS, &[])? {
            let stale = Self::deserialize::<mek_tycoon_core::AuthAttempts>(&value)
                .map_or(true, |attempts| attempts.is_stale(now));
            if stale {
                batch.delete_cf(&cf_attempts, &key);
                purge.attempts += 1;
            }
        }
        self.write(batch)?;
        Ok(purge)
    }
}
