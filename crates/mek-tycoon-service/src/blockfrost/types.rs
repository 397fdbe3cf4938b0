//! Blockfrost API types.

use serde::{Deserialize, Serialize};

/// One asset held by a stake address.
///
/// Returned by `/accounts/{stake_address}/addresses/assets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAsset {
    /// Policy id followed by the hex asset name.
    pub unit: String,
    /// Quantity as a decimal string.
    pub quantity: String,
}

/// Blockfrost error response.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockfrostErrorResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Short error name.
    pub error: String,
    /// Error message.
    pub message: String,
}
