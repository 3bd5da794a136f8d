use chrono::{DateTime, Utc};

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{check_optional_rfc3339_date, check_rfc3339_date};
use crate::crypto::{decode_public_key, DigestAlgorithm, PublicKey};
use crate::error::{ConsistencyError, SchemaError};
use crate::registry::{
    AssertionLookup, BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE,
};

/// Binds a public key to an account for a window of time.
///
/// The body carries the encoded public key; `public-key-sha3-384` must be
/// its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub(crate) base: AssertionBase,
    public_key: PublicKey,
    since: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
}

impl AccountKey {
    pub fn account_id(&self) -> &str {
        self.header_str("account-id")
    }

    pub fn name(&self) -> Option<&str> {
        self.headers().get_str("name")
    }

    pub fn public_key_id(&self) -> &str {
        self.header_str("public-key-sha3-384")
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    /// End of validity; `None` means open-ended.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }

    /// Whether `t` falls in `[since, until)`.
    pub fn is_key_valid_at(&self, t: DateTime<Utc>) -> bool {
        self.since <= t && self.until.map_or(true, |until| t < until)
    }
}

pub(crate) fn descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::AccountKey,
        primary_key: &["public-key-sha3-384"],
        required: &[
            ("account-id", HeaderCheck::NonEmptyString),
            ("public-key-sha3-384", HeaderCheck::Digest(DigestAlgorithm::Sha3_384)),
            ("since", HeaderCheck::Date),
        ],
        optional: &[
            ("until", HeaderCheck::Date),
            ("name", HeaderCheck::NonEmptyString),
        ],
        body: BodyPolicy::Mandatory,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble,
        consistency: Some(consistency),
    }
}

fn assemble(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let public_key = decode_public_key(base.body())?;
    if public_key.id() != base.header_str("public-key-sha3-384") {
        return Err(SchemaError::new("public key does not match provided key id"));
    }
    let since = check_rfc3339_date(base.headers(), "since")?;
    let until = check_optional_rfc3339_date(base.headers(), "until")?;
    if until.is_some_and(|until| until < since) {
        return Err(SchemaError::new("'until' time cannot be before 'since' time"));
    }
    Ok(Assertion::AccountKey(AccountKey {
        base,
        public_key,
        since,
        until,
    }))
}

fn consistency(
    doc: &Assertion,
    _signing_key: Option<&AccountKey>,
    lookup: &dyn AssertionLookup,
) -> Result<(), ConsistencyError> {
    let account_id = doc.header_str("account-id");
    if !super::account_exists(lookup, account_id)? {
        return Err(ConsistencyError::violation(format!(
            "account-key assertion for {account_id:?} does not have a matching account assertion"
        )));
    }
    Ok(())
}
