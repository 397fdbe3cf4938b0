//! Error types for Mek Tycoon domain rules.

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, TycoonError>;

/// Errors raised when a game rule rejects an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TycoonError {
    /// Not enough gold for a spend.
    #[error("insufficient gold: available={available}, required={required}")]
    InsufficientGold {
        /// Accumulated gold in hundredths.
        available: u64,
        /// Requested amount in hundredths.
        required: u64,
    },

    /// Amount must be positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Company name failed validation.
    #[error("invalid company name: {0}")]
    InvalidCompanyName(String),

    /// Another account already uses the company name.
    #[error("company name already taken: {0}")]
    CompanyNameTaken(String),

    /// The caller does not own the Mek.
    #[error("Mek #{mek} is not owned by this wallet")]
    NotOwner {
        /// Mek number.
        mek: u16,
    },

    /// The Mek is already slotted.
    #[error("Mek #{mek} is already slotted")]
    AlreadySlotted {
        /// Mek number.
        mek: u16,
    },

    /// The Mek is not slotted.
    #[error("Mek #{mek} is not slotted")]
    NotSlotted {
        /// Mek number.
        mek: u16,
    },

    /// Another Mek of the same wallet holds the slot.
    #[error("slot {slot} is occupied by Mek #{mek}")]
    SlotOccupied {
        /// Slot number.
        slot: u8,
        /// Mek currently in the slot.
        mek: u16,
    },

    /// The essence slot number is out of range.
    #[error("essence slot {slot} does not exist")]
    InvalidSlot {
        /// Requested slot.
        slot: u8,
    },

    /// The essence slot has not been unlocked.
    #[error("essence slot {slot} is locked")]
    SlotLocked {
        /// Slot number.
        slot: u8,
    },

    /// The essence slot is already unlocked.
    #[error("essence slot {slot} is already unlocked")]
    SlotAlreadyUnlocked {
        /// Slot number.
        slot: u8,
    },

    /// The essence slot holds no Mek.
    #[error("essence slot {slot} is empty")]
    SlotEmpty {
        /// Slot number.
        slot: u8,
    },

    /// The Mek's head, body and item variations are unknown.
    #[error("Mek #{mek} has no known variations")]
    UnknownVariations {
        /// Mek number.
        mek: u16,
    },

    /// Not enough essence of one variation.
    #[error("insufficient {variation} essence: available={available}, required={required}")]
    InsufficientEssence {
        /// Variation key.
        variation: String,
        /// Balance in hundredths.
        available: u64,
        /// Requested amount in hundredths.
        required: u64,
    },

    /// Essence configuration failed validation.
    #[error("invalid essence config: {0}")]
    InvalidEssenceConfig(String),

    /// No tenure threshold is configured for the level.
    #[error("level {level} is not configured")]
    LevelNotConfigured {
        /// The level that has no threshold.
        level: u32,
    },

    /// The campaign is not accepting reservations.
    #[error("campaign {name} is not active")]
    CampaignNotActive {
        /// Campaign name.
        name: String,
    },

    /// The campaign start date has not been reached.
    #[error("campaign {name} has not started")]
    CampaignNotStarted {
        /// Campaign name.
        name: String,
    },

    /// The campaign end date has passed.
    #[error("campaign {name} has ended")]
    CampaignEnded {
        /// Campaign name.
        name: String,
    },

    /// No NFT left to reserve.
    #[error("campaign {name} is sold out")]
    SoldOut {
        /// Campaign name.
        name: String,
    },

    /// The wallet already bought from this campaign.
    #[error("wallet already claimed an NFT from campaign {name}")]
    AlreadyClaimed {
        /// Campaign name.
        name: String,
    },

    /// The reservation is not active.
    #[error("reservation {id} is {status}")]
    ReservationNotActive {
        /// Reservation id.
        id: String,
        /// Current status.
        status: String,
    },

    /// The campaign inventory cannot be changed this way.
    #[error("invalid inventory: {0}")]
    InvalidInventory(String),

    /// The wallet is temporarily locked out of authentication.
    #[error("too many failed attempts, retry in {retry_after_seconds}s")]
    LockedOut {
        /// Seconds until the lockout ends.
        retry_after_seconds: i64,
    },

    /// The nonce challenge is missing, used, expired or different.
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    /// Signature verification failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Caller is not allowed to touch the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
