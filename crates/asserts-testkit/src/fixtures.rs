//! Test fixtures and helpers.
//!
//! A [`TrustFixture`] holds a trusted root authority with deterministic keys.
//! Brands hang off it the way third parties do in production: an account
//! and an account key, both signed by the root.

use asserts::{Database, DatabaseConfig};
use asserts_core::{
    encode_public_key, sign, sign_without_authority, Assertion, AssertionType, HeaderValue,
    Headers, PrivateKey,
};

/// Account id of the trusted root.
pub const ROOT_ID: &str = "canonical";

/// Timestamp used by documents that do not care about time.
pub const TIMESTAMP: &str = "2017-03-30T12:22:16Z";

/// Start of validity for fixture account keys.
pub const KEY_SINCE: &str = "2016-01-01T00:00:00Z";

/// Build headers from name/value pairs.
pub fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs.iter().copied().collect()
}

/// A deterministic key from a one-byte seed.
pub fn device_key(seed: u8) -> PrivateKey {
    PrivateKey::from_seed(&[seed; 32])
}

/// The trusted root and helpers for building signing chains under it.
pub struct TrustFixture {
    pub root_key: PrivateKey,
    pub root_account: Assertion,
    pub root_account_key: Assertion,
}

impl TrustFixture {
    pub fn new() -> Self {
        let root_key = PrivateKey::from_seed(&[0xCA; 32]);
        let root_account = account_signed_by(&root_key, ROOT_ID);
        let root_account_key =
            account_key_signed_by(&root_key, ROOT_ID, &root_key, KEY_SINCE, None);
        Self {
            root_key,
            root_account,
            root_account_key,
        }
    }

    /// The assertions a database should trust.
    pub fn trusted(&self) -> Vec<Assertion> {
        vec![self.root_account.clone(), self.root_account_key.clone()]
    }

    /// An in-memory database trusting the root.
    pub fn database(&self) -> Database {
        self.database_with(DatabaseConfig::default())
    }

    /// A database trusting the root, otherwise configured by `config`.
    pub fn database_with(&self, config: DatabaseConfig) -> Database {
        Database::open(DatabaseConfig {
            trusted: self.trusted(),
            ..config
        })
        .unwrap()
    }

    /// An account assertion signed by the root.
    pub fn account(&self, account_id: &str) -> Assertion {
        account_signed_by(&self.root_key, account_id)
    }

    /// An account-key assertion for `key`, signed by the root.
    pub fn account_key(
        &self,
        account_id: &str,
        key: &PrivateKey,
        since: &str,
        until: Option<&str>,
    ) -> Assertion {
        account_key_signed_by(&self.root_key, account_id, key, since, until)
    }

    /// A brand with an account and a key valid from [`KEY_SINCE`].
    pub fn brand(&self, brand_id: &str, seed: u8) -> Brand {
        self.brand_with_validity(brand_id, seed, KEY_SINCE, None)
    }

    pub fn brand_with_validity(
        &self,
        brand_id: &str,
        seed: u8,
        since: &str,
        until: Option<&str>,
    ) -> Brand {
        let key = device_key(seed);
        Brand {
            id: brand_id.to_string(),
            account: self.account(brand_id),
            account_key: self.account_key(brand_id, &key, since, until),
            key,
        }
    }

    /// Sign as the root authority.
    pub fn sign(&self, kind: AssertionType, mut headers: Headers, body: &[u8]) -> Assertion {
        headers.insert("authority-id", ROOT_ID);
        sign(kind, headers, body, &self.root_key).unwrap()
    }

    /// A snap-declaration signed by the root.
    pub fn snap_declaration(&self, snap_id: &str, snap_name: &str, publisher_id: &str) -> Assertion {
        self.sign(
            AssertionType::SnapDeclaration,
            headers(&[
                ("series", "16"),
                ("snap-id", snap_id),
                ("snap-name", snap_name),
                ("publisher-id", publisher_id),
                ("timestamp", TIMESTAMP),
            ]),
            b"",
        )
    }

    /// A snap-revision signed by the root, for a blob with digest `snap_sha3_384`.
    pub fn snap_revision(&self, snap_sha3_384: &str, snap_id: &str, developer_id: &str) -> Assertion {
        self.sign(
            AssertionType::SnapRevision,
            headers(&[
                ("snap-sha3-384", snap_sha3_384),
                ("snap-id", snap_id),
                ("snap-size", "4096"),
                ("snap-revision", "1"),
                ("developer-id", developer_id),
                ("timestamp", TIMESTAMP),
            ]),
            b"",
        )
    }
}

impl Default for TrustFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A third party with its own account and signing key.
pub struct Brand {
    pub id: String,
    pub key: PrivateKey,
    pub account: Assertion,
    pub account_key: Assertion,
}

impl Brand {
    /// The account and account key, in the order a database needs them.
    pub fn chain(&self) -> Vec<Assertion> {
        vec![self.account.clone(), self.account_key.clone()]
    }

    /// Sign with the brand key, as the brand.
    pub fn sign(&self, kind: AssertionType, mut headers: Headers, body: &[u8]) -> Assertion {
        headers.insert("authority-id", self.id.as_str());
        sign(kind, headers, body, &self.key).unwrap()
    }

    pub fn model(&self, model: &str, timestamp: &str) -> Assertion {
        self.sign(
            AssertionType::Model,
            model_headers(&self.id, model, timestamp),
            b"",
        )
    }

    pub fn repair(&self, repair_id: &str, revision: u64) -> Assertion {
        let mut headers = headers(&[
            ("brand-id", self.id.as_str()),
            ("repair-id", repair_id),
            ("summary", "fix the frobinator"),
            ("timestamp", TIMESTAMP),
        ]);
        headers.insert("revision", revision.to_string());
        headers.insert("models", HeaderValue::list(["frobinator"]));
        self.sign(AssertionType::Repair, headers, b"#!/bin/sh\necho fixed\n")
    }

    /// A serial binding `device` to `serial` of `model`.
    pub fn serial(&self, model: &str, serial: &str, device: &PrivateKey) -> Assertion {
        self.sign(
            AssertionType::Serial,
            serial_headers(&self.id, model, serial, device),
            b"",
        )
    }
}

/// Headers of a well-formed model, without authority.
pub fn model_headers(brand_id: &str, model: &str, timestamp: &str) -> Headers {
    headers(&[
        ("series", "16"),
        ("brand-id", brand_id),
        ("model", model),
        ("core", "core"),
        ("architecture", "amd64"),
        ("gadget", "brand-gadget"),
        ("kernel", "baz-linux"),
        ("store", "brand-store"),
        ("class", "fixed"),
        ("timestamp", timestamp),
    ])
}

/// Headers of a well-formed serial, without authority.
pub fn serial_headers(brand_id: &str, model: &str, serial: &str, device: &PrivateKey) -> Headers {
    let public = device.public_key();
    let mut headers = headers(&[
        ("brand-id", brand_id),
        ("model", model),
        ("serial", serial),
        ("timestamp", TIMESTAMP),
    ]);
    headers.insert("device-key", encode_public_key(&public));
    headers.insert("device-key-sha3-384", public.id());
    headers
}

/// A serial request self-signed by `device`.
pub fn serial_request(brand_id: &str, model: &str, device: &PrivateKey) -> Assertion {
    let mut headers = headers(&[
        ("brand-id", brand_id),
        ("model", model),
        ("request-id", "REQ-ID-1"),
    ]);
    headers.insert("device-key", encode_public_key(&device.public_key()));
    sign_without_authority(AssertionType::SerialRequest, headers, b"HW-DETAILS", device).unwrap()
}

fn account_signed_by(signer: &PrivateKey, account_id: &str) -> Assertion {
    let headers = headers(&[
        ("authority-id", ROOT_ID),
        ("account-id", account_id),
        ("display-name", account_id),
        ("validation", "verified"),
        ("timestamp", TIMESTAMP),
    ]);
    sign(AssertionType::Account, headers, b"", signer).unwrap()
}

fn account_key_signed_by(
    signer: &PrivateKey,
    account_id: &str,
    key: &PrivateKey,
    since: &str,
    until: Option<&str>,
) -> Assertion {
    let public = key.public_key();
    let mut headers = headers(&[
        ("authority-id", ROOT_ID),
        ("account-id", account_id),
        ("name", "default"),
        ("since", since),
    ]);
    headers.insert("public-key-sha3-384", public.id());
    if let Some(until) = until {
        headers.insert("until", until);
    }
    let body = encode_public_key(&public);
    sign(AssertionType::AccountKey, headers, body.as_bytes(), signer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_deterministic() {
        let a = TrustFixture::new();
        let b = TrustFixture::new();
        assert_eq!(a.root_account_key, b.root_account_key);
        assert_eq!(a.brand("acme", 1).account_key, b.brand("acme", 1).account_key);
    }

    #[test]
    fn test_brand_chain_verifies() {
        let fixture = TrustFixture::new();
        let brand = fixture.brand("acme", 1);
        let db = fixture.database();
        for doc in brand.chain() {
            db.add(&doc).unwrap();
        }
        db.add(&brand.repair("1", 0)).unwrap();
    }

    #[test]
    fn test_distinct_brands() {
        let fixture = TrustFixture::new();
        let a = fixture.brand("acme", 1);
        let b = fixture.brand("globex", 2);
        assert_ne!(a.key.public_key(), b.key.public_key());
        assert_ne!(a.account_key.primary_key(), b.account_key.primary_key());
    }
}
