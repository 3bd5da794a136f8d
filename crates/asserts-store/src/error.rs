//! Error types for the store module.

use asserts_core::{CryptoError, DecodeError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored assertion no longer decodes.
    #[error("cannot decode stored assertion: {0}")]
    Decode(#[from] DecodeError),

    /// A stored private key no longer decodes.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("key pair with given key id already exists")]
    KeyPairExists,

    #[error("cannot find key pair")]
    KeyPairNotFound,

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
