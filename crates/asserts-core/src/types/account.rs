use chrono::{DateTime, Utc};

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{check_optional_string, check_rfc3339_date};
use crate::error::{ConsistencyError, SchemaError};
use crate::registry::{
    AssertionLookup, BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE,
};
use crate::types::AccountKey;

/// How an account's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Certified,
    Verified,
    Unproven,
}

impl Validation {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "certified" => Some(Self::Certified),
            "verified" => Some(Self::Verified),
            "unproven" => Some(Self::Unproven),
            _ => None,
        }
    }
}

/// Holds an account's identity details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub(crate) base: AssertionBase,
    validation: Validation,
    timestamp: DateTime<Utc>,
}

impl Account {
    pub fn account_id(&self) -> &str {
        self.header_str("account-id")
    }

    pub fn display_name(&self) -> &str {
        self.header_str("display-name")
    }

    pub fn username(&self) -> Option<&str> {
        self.headers().get_str("username")
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::Account,
        primary_key: &["account-id"],
        required: &[
            ("display-name", HeaderCheck::NonEmptyString),
            ("validation", HeaderCheck::NonEmptyString),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[("username", HeaderCheck::String)],
        body: BodyPolicy::Forbidden,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble,
        consistency: Some(consistency),
    }
}

fn assemble(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let value = base.header_str("validation");
    let validation = Validation::parse(value).ok_or_else(|| {
        SchemaError::new(format!("unknown \"validation\" header value: {value:?}"))
    })?;
    check_optional_string(base.headers(), "username")?;
    let timestamp = check_rfc3339_date(base.headers(), "timestamp")?;
    Ok(Assertion::Account(Account {
        base,
        validation,
        timestamp,
    }))
}

fn consistency(
    doc: &Assertion,
    _signing_key: Option<&AccountKey>,
    lookup: &dyn AssertionLookup,
) -> Result<(), ConsistencyError> {
    let authority_id = super::authority_of(doc);
    if !lookup.is_trusted_account(authority_id) {
        return Err(ConsistencyError::violation(format!(
            "account assertion {:?} is not signed by a directly trusted authority: {:?}",
            doc.header_str("account-id"),
            authority_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::testutil::{assert_mandatory, decode_head, decode_parts, replace};

    const HEAD: &str = "type: account\n\
                        authority-id: canonical\n\
                        account-id: abc-123\n\
                        display-name: Nice User\n\
                        username: nice\n\
                        validation: certified\n\
                        timestamp: 2017-03-30T12:22:16Z";

    #[test]
    fn test_decode_ok() {
        let doc = decode_head(HEAD).unwrap();
        let account = doc.as_account().unwrap();
        assert_eq!(account.account_id(), "abc-123");
        assert_eq!(account.display_name(), "Nice User");
        assert_eq!(account.username(), Some("nice"));
        assert_eq!(account.validation(), Validation::Certified);
        assert_eq!(account.authority_id(), Some("canonical"));
        assert_eq!(account.primary_key(), ["abc-123"]);
    }

    #[test]
    fn test_decode_invalid() {
        assert_mandatory(HEAD, &["account-id", "display-name", "validation", "timestamp"], "account");

        let err = decode_head(&replace(HEAD, "validation", "starred")).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"assertion account: unknown "validation" header value: "starred""#
        );

        let err = decode_parts(HEAD, "body").unwrap_err();
        assert_eq!(err.to_string(), "assertion account: body must be empty");
    }
}
