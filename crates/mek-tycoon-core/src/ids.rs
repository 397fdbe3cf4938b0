//! Identifier types for Mek Tycoon.
//!
//! Wallet identity is a Cardano stake address, Meks are numbered within the
//! fixed 4000-piece collection, and campaign-side records use ULIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Required prefix of a mainnet stake address.
pub const STAKE_ADDRESS_PREFIX: &str = "stake1";

/// Shortest accepted stake address.
pub const STAKE_ADDRESS_MIN_LEN: usize = 59;

/// Longest accepted stake address.
pub const STAKE_ADDRESS_MAX_LEN: usize = 103;

/// Number of Meks in the collection.
pub const TOTAL_MEKS: u16 = 4000;

/// Check whether `value` looks like a mainnet stake address.
///
/// Only the shape is checked: `stake1` prefix, 59 to 103 characters, lowercase
/// ASCII letters and digits only. Testnet `stake_test1` addresses fail the
/// character check on the underscore.
#[must_use]
pub fn is_valid_stake_address(value: &str) -> bool {
    value.starts_with(STAKE_ADDRESS_PREFIX)
        && (STAKE_ADDRESS_MIN_LEN..=STAKE_ADDRESS_MAX_LEN).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// A validated Cardano stake address, the wallet identity of an account.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StakeAddress(String);

impl StakeAddress {
    /// Return the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the address bytes, used as a storage key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Shortened form shown on the leaderboard: first 8 and last 6 characters.
    #[must_use]
    pub fn short(&self) -> String {
        let head = &self.0[..8];
        let tail = &self.0[self.0.len() - 6..];
        format!("{head}...{tail}")
    }
}

impl FromStr for StakeAddress {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_stake_address(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(IdError::InvalidStakeAddress)
        }
    }
}

impl fmt::Debug for StakeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StakeAddress({})", self.0)
    }
}

impl fmt::Display for StakeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StakeAddress {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_stake_address(&value) {
            Ok(Self(value))
        } else {
            Err(IdError::InvalidStakeAddress)
        }
    }
}

impl From<StakeAddress> for String {
    fn from(address: StakeAddress) -> Self {
        address.0
    }
}

impl AsRef<[u8]> for StakeAddress {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A Mek number in `1..=4000`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct MekNumber(u16);

impl MekNumber {
    /// Create a Mek number, checking the collection range.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::MekNumberOutOfRange`] outside `1..=4000`.
    pub fn new(value: u16) -> Result<Self, IdError> {
        if (1..=TOTAL_MEKS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(IdError::MekNumberOutOfRange(u32::from(value)))
        }
    }

    /// Return the raw number.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Big-endian bytes, so keys sort by Mek number.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl FromStr for MekNumber {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.parse().map_err(|_| IdError::InvalidMekNumber)?;
        u16::try_from(value)
            .map_err(|_| IdError::MekNumberOutOfRange(value))
            .and_then(Self::new)
    }
}

impl fmt::Debug for MekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MekNumber({})", self.0)
    }
}

impl fmt::Display for MekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for MekNumber {
    type Error = IdError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MekNumber> for u16 {
    fn from(number: MekNumber) -> Self {
        number.0
    }
}

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a new identifier with the current timestamp.
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new())
            }

            /// Return the bytes of the ULID (16 bytes).
            #[must_use]
            pub fn to_bytes(&self) -> [u8; 16] {
                self.0.to_bytes()
            }

            /// Create an identifier from stored bytes.
            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Ulid::from_bytes(bytes))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
                Ok(Self(ulid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

ulid_id!(
    /// A commemorative NFT campaign identifier.
    CampaignId
);

ulid_id!(
    /// A reservation identifier, time-ordered within a campaign.
    ReservationId
);

ulid_id!(
    /// A tenure buff identifier.
    BuffId
);

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a mainnet stake address.
    #[error("invalid stake address")]
    InvalidStakeAddress,

    /// The input is not a number.
    #[error("invalid Mek number")]
    InvalidMekNumber,

    /// The number is outside the collection.
    #[error("Mek number {0} is outside 1..=4000")]
    MekNumberOutOfRange(u32),

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}
