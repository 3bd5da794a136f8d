use chrono::{DateTime, Utc};

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{check_public_key, check_rfc3339_date};
use crate::crypto::{DigestAlgorithm, PublicKey};
use crate::error::{ConsistencyError, SchemaError};
use crate::registry::{
    AssertionLookup, BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE,
};
use crate::types::AccountKey;

/// Binds a device serial to its device key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serial {
    pub(crate) base: AssertionBase,
    device_key: PublicKey,
    timestamp: DateTime<Utc>,
}

impl Serial {
    pub fn brand_id(&self) -> &str {
        self.header_str("brand-id")
    }

    pub fn model(&self) -> &str {
        self.header_str("model")
    }

    pub fn serial(&self) -> &str {
        self.header_str("serial")
    }

    pub fn device_key(&self) -> &PublicKey {
        &self.device_key
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::Serial,
        primary_key: &["brand-id", "model", "serial"],
        required: &[
            ("device-key", HeaderCheck::PublicKey),
            ("device-key-sha3-384", HeaderCheck::Digest(DigestAlgorithm::Sha3_384)),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[],
        body: BodyPolicy::Optional,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble,
        consistency: Some(consistency),
    }
}

fn assemble(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let device_key = check_public_key(base.headers(), "device-key")?;
    if device_key.id() != base.header_str("device-key-sha3-384") {
        return Err(SchemaError::new("device key does not match provided key id"));
    }
    let timestamp = check_rfc3339_date(base.headers(), "timestamp")?;
    Ok(Assertion::Serial(Serial {
        base,
        device_key,
        timestamp,
    }))
}

// The brand may sign its own serials; anyone else must be trusted.
fn consistency(
    doc: &Assertion,
    _signing_key: Option<&AccountKey>,
    lookup: &dyn AssertionLookup,
) -> Result<(), ConsistencyError> {
    let authority_id = super::authority_of(doc);
    let brand_id = doc.header_str("brand-id");
    if authority_id != brand_id && !lookup.is_trusted_account(authority_id) {
        return Err(ConsistencyError::violation(format!(
            "serial with authority {authority_id:?} different from brand {brand_id:?} must be signed by a trusted authority"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encode_public_key, PrivateKey};
    use crate::types::testutil::{assert_mandatory, decode_head, decode_parts, replace, TIMESTAMP};

    fn head() -> String {
        let key = PrivateKey::from_seed(&[0x21; 32]).public_key();
        format!(
            "type: serial\n\
             authority-id: brand-id1\n\
             brand-id: brand-id1\n\
             model: baz-3000\n\
             serial: 2700\n\
             device-key: {}\n\
             device-key-sha3-384: {}\n\
             timestamp: {TIMESTAMP}",
            encode_public_key(&key),
            key.id()
        )
    }

    #[test]
    fn test_decode_ok() {
        let doc = decode_parts(&head(), "HW-DETAILS").unwrap();
        let serial = doc.as_serial().unwrap();
        assert_eq!(serial.brand_id(), "brand-id1");
        assert_eq!(serial.model(), "baz-3000");
        assert_eq!(serial.serial(), "2700");
        assert_eq!(
            serial.device_key(),
            &PrivateKey::from_seed(&[0x21; 32]).public_key()
        );
        assert_eq!(&serial.body()[..], b"HW-DETAILS");
        assert_eq!(doc.primary_key(), ["brand-id1", "baz-3000", "2700"]);
    }

    #[test]
    fn test_decode_invalid() {
        assert_mandatory(
            &head(),
            &["brand-id", "model", "serial", "device-key", "device-key-sha3-384", "timestamp"],
            "serial",
        );

        let other = PrivateKey::from_seed(&[0x22; 32]).public_key().id();
        let err = decode_head(&replace(&head(), "device-key-sha3-384", &other)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "assertion serial: device key does not match provided key id"
        );

        let err = decode_head(&replace(&head(), "device-key", "$$$")).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("assertion serial: cannot decode public key: "));
    }
}
