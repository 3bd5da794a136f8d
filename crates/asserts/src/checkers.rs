//! Checks run on every verified assertion before it is committed.

use asserts_core::{AccountKey, Assertion, AssertionLookup, TypeRegistry};
use chrono::{DateTime, Utc};

use crate::error::{DatabaseError, Result};

/// Everything a checker may look at.
pub struct CheckContext<'a> {
    pub assertion: &'a Assertion,
    /// The key that signed the assertion, `None` for self-signed ones.
    pub signing_key: Option<&'a AccountKey>,
    pub lookup: &'a dyn AssertionLookup,
    pub registry: &'a TypeRegistry,
    pub now: DateTime<Utc>,
}

/// A check over a verified assertion.
pub type Checker = fn(&CheckContext<'_>) -> Result<()>;

/// The checkers a database runs unless configured otherwise.
pub const DEFAULT_CHECKERS: &[Checker] = &[check_signing_key_expiry, check_consistency];

/// The signing key must be valid at the time of the check.
pub fn check_signing_key_expiry(ctx: &CheckContext<'_>) -> Result<()> {
    let Some(key) = ctx.signing_key else {
        return Ok(());
    };
    if !key.is_key_valid_at(ctx.now) {
        return Err(DatabaseError::ExpiredKey {
            key_id: key.public_key_id().to_string(),
            authority_id: key.account_id().to_string(),
        });
    }
    Ok(())
}

/// Run the type's own cross-document consistency rule.
pub fn check_consistency(ctx: &CheckContext<'_>) -> Result<()> {
    let descriptor = ctx
        .registry
        .get(ctx.assertion.kind())
        .ok_or(DatabaseError::UnknownType(ctx.assertion.kind().name()))?;
    descriptor.check_consistency(ctx.assertion, ctx.signing_key, ctx.lookup)?;
    Ok(())
}
