//! Error types for the Database.

use asserts_core::{ConsistencyError, DecodeError, SignError, VerifyError};
use asserts_store::StoreError;
use thiserror::Error;

/// An add refused because it would not move the revision forward.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionError {
    #[error("revision {0} is already the current revision")]
    Current(u64),

    #[error("revision {revision} is older than current revision {current}")]
    Older { revision: u64, current: u64 },
}

impl RevisionError {
    pub(crate) fn new(revision: u64, current: u64) -> Self {
        if revision == current {
            Self::Current(revision)
        } else {
            Self::Older { revision, current }
        }
    }
}

/// Errors that can occur during Database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No assertion matches the lookup.
    #[error("{type_name} assertion not found")]
    NotFound { type_name: &'static str },

    #[error(transparent)]
    Revision(#[from] RevisionError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Sign(#[from] SignError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("assertion is signed with expired public key {key_id:?} from {authority_id:?}")]
    ExpiredKey { key_id: String, authority_id: String },

    #[error("cannot add {type_name:?} assertion with primary key clashing with a trusted assertion: {primary_key:?}")]
    TrustedClash {
        type_name: &'static str,
        primary_key: Vec<String>,
    },

    #[error("cannot sign assertion with unknown key {key_id:?} for authority {authority_id:?}")]
    UnknownSigningKey { key_id: String, authority_id: String },

    #[error("cannot predefine trusted assertions that are not account-key or account: {0}")]
    UntrustableType(&'static str),

    #[error("cannot predefine more than one trusted {type_name:?} assertion with primary key {primary_key:?}")]
    DuplicateTrusted {
        type_name: &'static str,
        primary_key: Vec<String>,
    },

    #[error("must provide primary key: {0}")]
    MissingPrimaryKey(&'static str),

    #[error("unknown assertion type: {0:?}")]
    UnknownType(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DatabaseError {
    /// Whether this is the distinguished not-found outcome of a lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for Database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
