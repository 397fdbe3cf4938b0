//! Error types for Mek Tycoon storage.

use mek_tycoon_core::TycoonError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record.
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// A game rule rejected an atomic update; nothing was written.
    #[error(transparent)]
    Domain(#[from] TycoonError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
