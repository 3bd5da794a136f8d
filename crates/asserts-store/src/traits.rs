//! Backstore trait: the abstract interface for assertion persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests and
//! for holding trusted assertions).

use asserts_core::{Assertion, AssertionType};

use crate::error::Result;

/// Result of putting an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    /// Nothing was stored under this primary key before.
    Inserted,
    /// An older revision was replaced.
    Replaced {
        /// Revision of the assertion that was replaced.
        previous: u64,
    },
    /// An assertion with the same or a newer revision is already stored.
    Conflict {
        /// Revision of the stored assertion.
        current: u64,
    },
}

/// Storage for assertions keyed by type and primary key.
///
/// # Design Notes
///
/// - **One current revision**: for each (type, primary key) at most one
///   assertion is kept, the one with the highest revision.
/// - **Atomic put**: the revision comparison and the write happen under the
///   same lock or transaction, so concurrent writers cannot both win.
/// - **No validation**: callers verify before putting.
pub trait Backstore: Send + Sync {
    /// Store `assertion` unless one with an equal or newer revision exists.
    fn put(&self, assertion: &Assertion) -> Result<PutResult>;

    /// Fetch the current assertion for an exact primary key.
    fn get(&self, kind: AssertionType, primary_key: &[&str]) -> Result<Option<Assertion>>;

    /// Fetch all assertions of `kind` whose primary key starts with `prefix`.
    ///
    /// An empty prefix returns every assertion of the type.
    fn search(&self, kind: AssertionType, prefix: &[&str]) -> Result<Vec<Assertion>>;
}

pub(crate) fn has_prefix(primary_key: &[String], prefix: &[&str]) -> bool {
    primary_key.len() >= prefix.len() && primary_key.iter().zip(prefix).all(|(k, p)| k == p)
}
