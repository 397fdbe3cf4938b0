//! Key encoding utilities for `RocksDB`.

use mek_tycoon_core::{CampaignId, LeaderboardCategory, MekNumber, ReservationId, StakeAddress};

/// Separator between a stake address and a Mek number in the owner index.
/// Stake addresses are lowercase alphanumeric, so it never appears inside one.
const OWNER_SEPARATOR: u8 = b'/';

/// Create an account key from a stake address.
#[must_use]
pub fn account_key(wallet: &StakeAddress) -> Vec<u8> {
    wallet.as_bytes().to_vec()
}

/// Create a Mek key.
#[must_use]
pub fn mek_key(mek: MekNumber) -> Vec<u8> {
    mek.to_be_bytes().to_vec()
}

/// Create an owner index key.
///
/// Format: `stake_address || '/' || mek_number (2 bytes, big-endian)`
#[must_use]
pub fn owner_mek_key(wallet: &StakeAddress, mek: MekNumber) -> Vec<u8> {
    let mut key = owner_prefix(wallet);
    key.extend_from_slice(&mek.to_be_bytes());
    key
}

/// Prefix for iterating all Meks of an owner.
#[must_use]
pub fn owner_prefix(wallet: &StakeAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(wallet.as_bytes().len() + 3);
    key.extend_from_slice(wallet.as_bytes());
    key.push(OWNER_SEPARATOR);
    key
}

/// Extract the Mek number from an owner index key.
#[must_use]
pub fn extract_mek_from_owner_key(key: &[u8]) -> Option<MekNumber> {
    let tail: [u8; 2] = key.get(key.len().checked_sub(2)?..)?.try_into().ok()?;
    MekNumber::new(u16::from_be_bytes(tail)).ok()
}

/// Create a leaderboard key.
///
/// Format: `category_tag (1 byte) || rank (4 bytes, big-endian)`, so a prefix
/// scan returns a category in rank order.
#[must_use]
pub fn leaderboard_key(category: LeaderboardCategory, rank: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(category.tag());
    key.extend_from_slice(&rank.to_be_bytes());
    key
}

/// Prefix for one leaderboard category.
#[must_use]
pub fn leaderboard_prefix(category: LeaderboardCategory) -> Vec<u8> {
    vec![category.tag()]
}

/// Create a campaign key.
#[must_use]
pub fn campaign_key(id: &CampaignId) -> Vec<u8> {
    id.to_bytes().to_vec()
}

/// Create a reservation index key.
#[must_use]
pub fn reservation_key(id: &ReservationId) -> Vec<u8> {
    id.to_bytes().to_vec()
}

/// Decode a campaign id stored as an index value.
#[must_use]
pub fn campaign_id_from_bytes(bytes: &[u8]) -> Option<CampaignId> {
    let raw: [u8; 16] = bytes.try_into().ok()?;
    Some(CampaignId::from_bytes(raw))
}
