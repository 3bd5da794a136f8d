//! Snap identity and revision assertions, signed by the store.

use chrono::{DateTime, Utc};

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{check_int, check_rfc3339_date};
use crate::crypto::DigestAlgorithm;
use crate::error::{ConsistencyError, SchemaError};
use crate::registry::{
    AssertionLookup, BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE,
};
use crate::types::AccountKey;

/// The series snap revisions are looked up under.
pub const DEFAULT_SERIES: &str = "16";

/// Binds a snap name to a snap id and its publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapDeclaration {
    pub(crate) base: AssertionBase,
    timestamp: DateTime<Utc>,
}

impl SnapDeclaration {
    pub fn series(&self) -> &str {
        self.header_str("series")
    }

    pub fn snap_id(&self) -> &str {
        self.header_str("snap-id")
    }

    pub fn snap_name(&self) -> &str {
        self.header_str("snap-name")
    }

    pub fn publisher_id(&self) -> &str {
        self.header_str("publisher-id")
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn snap_declaration_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::SnapDeclaration,
        primary_key: &["series", "snap-id"],
        required: &[
            ("snap-name", HeaderCheck::NonEmptyString),
            ("publisher-id", HeaderCheck::NonEmptyString),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[],
        body: BodyPolicy::Optional,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble: assemble_snap_declaration,
        consistency: Some(snap_declaration_consistency),
    }
}

fn assemble_snap_declaration(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let timestamp = check_rfc3339_date(base.headers(), "timestamp")?;
    Ok(Assertion::SnapDeclaration(SnapDeclaration { base, timestamp }))
}

fn snap_declaration_consistency(
    doc: &Assertion,
    _signing_key: Option<&AccountKey>,
    lookup: &dyn AssertionLookup,
) -> Result<(), ConsistencyError> {
    let snap_name = doc.header_str("snap-name");
    let snap_id = doc.header_str("snap-id");
    let authority_id = super::authority_of(doc);
    if !lookup.is_trusted_account(authority_id) {
        return Err(ConsistencyError::violation(format!(
            "snap-declaration assertion for {snap_name:?} (id {snap_id:?}) is not signed by a directly trusted authority: {authority_id:?}"
        )));
    }
    let publisher_id = doc.header_str("publisher-id");
    if !super::account_exists(lookup, publisher_id)? {
        return Err(ConsistencyError::violation(format!(
            "snap-declaration assertion for {snap_name:?} (id {snap_id:?}) does not have a matching account assertion for the publisher {publisher_id:?}"
        )));
    }
    Ok(())
}

/// Vouches for one uploaded snap blob, identified by its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapRevision {
    pub(crate) base: AssertionBase,
    snap_size: u64,
    snap_revision: u64,
    timestamp: DateTime<Utc>,
}

impl SnapRevision {
    pub fn snap_sha3_384(&self) -> &str {
        self.header_str("snap-sha3-384")
    }

    pub fn snap_id(&self) -> &str {
        self.header_str("snap-id")
    }

    pub fn snap_size(&self) -> u64 {
        self.snap_size
    }

    pub fn snap_revision(&self) -> u64 {
        self.snap_revision
    }

    pub fn developer_id(&self) -> &str {
        self.header_str("developer-id")
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn snap_revision_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::SnapRevision,
        primary_key: &["snap-sha3-384"],
        required: &[
            ("snap-sha3-384", HeaderCheck::Digest(DigestAlgorithm::Sha3_384)),
            ("snap-id", HeaderCheck::NonEmptyString),
            ("snap-size", HeaderCheck::Integer),
            ("snap-revision", HeaderCheck::Integer),
            ("developer-id", HeaderCheck::NonEmptyString),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[],
        body: BodyPolicy::Forbidden,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble: assemble_snap_revision,
        consistency: Some(snap_revision_consistency),
    }
}

fn assemble_snap_revision(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let snap_size = check_int(base.headers(), "snap-size")?;
    if snap_size < 0 {
        return Err(SchemaError::new(format!(
            "\"snap-size\" header must be >=0: {snap_size}"
        )));
    }
    let snap_revision = check_int(base.headers(), "snap-revision")?;
    if snap_revision < 1 {
        return Err(SchemaError::new(format!(
            "\"snap-revision\" header must be >=1: {snap_revision}"
        )));
    }
    let timestamp = check_rfc3339_date(base.headers(), "timestamp")?;
    Ok(Assertion::SnapRevision(SnapRevision {
        base,
        snap_size: snap_size as u64,
        snap_revision: snap_revision as u64,
        timestamp,
    }))
}

fn snap_revision_consistency(
    doc: &Assertion,
    _signing_key: Option<&AccountKey>,
    lookup: &dyn AssertionLookup,
) -> Result<(), ConsistencyError> {
    let snap_id = doc.header_str("snap-id");
    let authority_id = super::authority_of(doc);
    if !lookup.is_trusted_account(authority_id) {
        return Err(ConsistencyError::violation(format!(
            "snap-revision assertion for snap id {snap_id:?} is not signed by a directly trusted authority: {authority_id:?}"
        )));
    }
    if lookup
        .find(AssertionType::SnapDeclaration, &[DEFAULT_SERIES, snap_id])?
        .is_none()
    {
        return Err(ConsistencyError::violation(format!(
            "snap-revision assertion for snap id {snap_id:?} does not have a matching snap-declaration assertion"
        )));
    }
    let developer_id = doc.header_str("developer-id");
    if !super::account_exists(lookup, developer_id)? {
        return Err(ConsistencyError::violation(format!(
            "snap-revision assertion for snap id {snap_id:?} does not have a matching account assertion for the developer {developer_id:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::testutil::{assert_mandatory, decode_head, replace, TIMESTAMP};

    const SNAP_DIGEST: &str = "BQkSrUtr7J0exsRI9BNmYGlTh7C7mAiyA6EnsXXfcvmBXnrXSeVzWfuEtxmielh_";

    fn declaration_head() -> String {
        format!(
            "type: snap-declaration\n\
             authority-id: canonical\n\
             series: 16\n\
             snap-id: snap-id-1\n\
             snap-name: first\n\
             publisher-id: dev-id1\n\
             timestamp: {TIMESTAMP}"
        )
    }

    fn revision_head() -> String {
        format!(
            "type: snap-revision\n\
             authority-id: canonical\n\
             snap-sha3-384: {SNAP_DIGEST}\n\
             snap-id: snap-id-1\n\
             snap-size: 123\n\
             snap-revision: 1\n\
             developer-id: dev-id1\n\
             timestamp: {TIMESTAMP}"
        )
    }

    #[test]
    fn test_snap_declaration_decode() {
        let doc = decode_head(&declaration_head()).unwrap();
        let decl = doc.as_snap_declaration().unwrap();
        assert_eq!(decl.series(), "16");
        assert_eq!(decl.snap_id(), "snap-id-1");
        assert_eq!(decl.snap_name(), "first");
        assert_eq!(decl.publisher_id(), "dev-id1");
        assert_eq!(doc.primary_key(), ["16", "snap-id-1"]);

        assert_mandatory(
            &declaration_head(),
            &["series", "snap-id", "snap-name", "publisher-id", "timestamp"],
            "snap-declaration",
        );
    }

    #[test]
    fn test_snap_revision_decode() {
        let doc = decode_head(&revision_head()).unwrap();
        let rev = doc.as_snap_revision().unwrap();
        assert_eq!(rev.snap_sha3_384(), SNAP_DIGEST);
        assert_eq!(rev.snap_id(), "snap-id-1");
        assert_eq!(rev.snap_size(), 123);
        assert_eq!(rev.snap_revision(), 1);
        assert_eq!(rev.developer_id(), "dev-id1");

        assert_mandatory(
            &revision_head(),
            &["snap-sha3-384", "snap-id", "snap-size", "snap-revision", "developer-id", "timestamp"],
            "snap-revision",
        );
    }

    #[test]
    fn test_snap_revision_invalid() {
        let cases = [
            ("snap-revision", "0", r#"assertion snap-revision: "snap-revision" header must be >=1: 0"#),
            ("snap-size", "-1", r#"assertion snap-revision: "snap-size" header must be >=0: -1"#),
            ("snap-size", "big", r#"assertion snap-revision: "snap-size" header is not an integer: big"#),
            ("snap-sha3-384", "abc", r#"assertion snap-revision: "snap-sha3-384" header does not have the expected bit length: 16"#),
        ];
        for (name, value, expected) in cases {
            let err = decode_head(&replace(&revision_head(), name, value)).unwrap_err();
            assert_eq!(err.to_string(), expected, "{name}");
        }
    }
}
