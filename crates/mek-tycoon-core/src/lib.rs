//! Core types and rules for the Mek Tycoon economy.
//!
//! This crate is pure: no I/O, and every time-dependent operation takes `now`.
//!
//! - **Identifiers**: `StakeAddress`, `MekNumber`, `CampaignId`, `ReservationId`, `BuffId`
//! - **Accrual**: the shared `pending` formula and `AccrualCap`
//! - **Accounts**: `MinerAccount`, gold collection, company names
//! - **Gold rates**: default per-Mek rate and `GoldRateCurve`
//! - **Meks and tenure**: `MekRecord`, `TenureSettings`, `TenureBuff`
//! - **Essence**: `EssenceState` slots and per-variation balances
//! - **Leaderboard**: `compute_rankings`
//! - **Campaigns**: `CampaignBook` reservations with lazy expiry
//! - **Wallet auth**: `NonceChallenge`, `AuthAttempts`
//!
//! # Units
//!
//! **1 stored unit = 0.01 gold (or tenure)**
//!
//! - A Mek earning 55.01 gold/hour has a rate of `5501`
//! - Amounts are `u64` hundredths so that accrual stays integer

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod accrual;
pub mod auth;
pub mod error;
pub mod essence;
pub mod gold;
pub mod ids;
pub mod leaderboard;
pub mod mek;
pub mod reservation;
pub mod tenure;

pub use account::{
    validate_company_name, Checkpoint, MinerAccount, OwnedMek, CHECKPOINT_DEBOUNCE_SECONDS,
};
pub use accrual::{format_units, pending, AccrualCap, DEFAULT_GOLD_CAP_HOURS};
pub use auth::{AuthAttempts, NonceChallenge, SESSION_TTL_SECONDS};
pub use error::{Result, TycoonError};
pub use essence::{
    variations_from_source_key, EssenceBuff, EssenceConfig, EssenceConfigUpdate, EssenceSlot,
    EssenceState, SlotRequirement, SlotUnlock, SlottedMek, Variation, VariationKind,
    ESSENCE_SLOTS,
};
pub use gold::{default_rate, CurveType, GoldRateCurve, Rounding};
pub use ids::{
    is_valid_stake_address, BuffId, CampaignId, IdError, MekNumber, ReservationId, StakeAddress,
};
pub use leaderboard::{compute_rankings, LeaderboardCategory, LeaderboardEntry};
pub use mek::{LevelUpOutcome, MekRecord, DEFAULT_MAX_LEVELS};
pub use reservation::{
    Campaign, CampaignBook, CampaignStatus, InventoryItem, NewInventoryItem, NftStatus,
    PaymentWindow, ReleaseReason, Reservation, ReservationPolicy, ReservationStatus,
    ReserveOutcome,
};
pub use tenure::{effective_rate, BuffScope, TenureBuff, TenureSettings};
