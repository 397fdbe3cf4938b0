//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Miner accounts, keyed by stake address.
    pub const ACCOUNTS: &str = "accounts";

    /// Mek records, keyed by big-endian Mek number.
    pub const MEKS: &str = "meks";

    /// Index: Meks by owner, keyed by `stake_address || '/' || mek_number`.
    /// Value is empty (index only).
    pub const MEKS_BY_OWNER: &str = "meks_by_owner";

    /// Leaderboard snapshot, keyed by `category_tag || rank`.
    pub const LEADERBOARD: &str = "leaderboard";

    /// Campaign books (campaign, inventory, reservations), keyed by campaign id.
    pub const CAMPAIGNS: &str = "campaigns";

    /// Index: reservation id to campaign id.
    pub const RESERVATIONS: &str = "reservations";

    /// Singleton settings records, keyed by name.
    pub const SETTINGS: &str = "settings";

    /// Tenure buffs, keyed by buff id.
    pub const TENURE_BUFFS: &str = "tenure_buffs";

    /// Outstanding nonce challenges, keyed by stake address.
    pub const AUTH_NONCES: &str = "auth_nonces";

    /// Failed verification history, keyed by stake address.
    pub const AUTH_ATTEMPTS: &str = "auth_attempts";

    /// Essence slots, balances and buffs, keyed by stake address.
    pub const ESSENCE: &str = "essence";
}

/// Keys in the [`cf::SETTINGS`] column family.
pub mod settings {
    /// Tenure configuration.
    pub const TENURE: &str = "tenure";

    /// Configured gold rate curve.
    pub const GOLD_RATE_CURVE: &str = "gold_rate_curve";

    /// Essence configuration.
    pub const ESSENCE_CONFIG: &str = "essence_config";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::MEKS,
        cf::MEKS_BY_OWNER,
        cf::LEADERBOARD,
        cf::CAMPAIGNS,
        cf::RESERVATIONS,
        cf::SETTINGS,
        cf::TENURE_BUFFS,
        cf::AUTH_NONCES,
        cf::AUTH_ATTEMPTS,
        cf::ESSENCE,
    ]
}
