//! Requests made by devices, signed with their own device key.

use chrono::{DateTime, Utc};

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{check_public_key, check_rfc3339_date};
use crate::crypto::PublicKey;
use crate::error::SchemaError;
use crate::registry::{BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE};

/// A device asking for a serial, self-signed with the key it presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialRequest {
    pub(crate) base: AssertionBase,
    device_key: PublicKey,
}

impl SerialRequest {
    pub fn brand_id(&self) -> &str {
        self.header_str("brand-id")
    }

    pub fn model(&self) -> &str {
        self.header_str("model")
    }

    /// The serial proposed by the device, if any.
    pub fn serial(&self) -> Option<&str> {
        self.headers().get_str("serial")
    }

    pub fn request_id(&self) -> &str {
        self.header_str("request-id")
    }

    pub fn device_key(&self) -> &PublicKey {
        &self.device_key
    }
}

pub(crate) fn serial_request_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::SerialRequest,
        primary_key: &[],
        required: &[
            ("brand-id", HeaderCheck::NonEmptyString),
            ("model", HeaderCheck::NonEmptyString),
            ("device-key", HeaderCheck::PublicKey),
            ("request-id", HeaderCheck::NonEmptyString),
        ],
        optional: &[("serial", HeaderCheck::String)],
        body: BodyPolicy::Optional,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: false,
        assemble: assemble_serial_request,
        consistency: None,
    }
}

fn assemble_serial_request(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let device_key = check_public_key(base.headers(), "device-key")?;
    if device_key.id() != base.sign_key_id() {
        return Err(SchemaError::new(
            "device key does not match included signing key id",
        ));
    }
    Ok(Assertion::SerialRequest(SerialRequest { base, device_key }))
}

/// A device asking for a store session.
///
/// It does not embed its key; the signature is checked against the device
/// key of the matching serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSessionRequest {
    pub(crate) base: AssertionBase,
    timestamp: DateTime<Utc>,
}

impl DeviceSessionRequest {
    pub fn brand_id(&self) -> &str {
        self.header_str("brand-id")
    }

    pub fn model(&self) -> &str {
        self.header_str("model")
    }

    pub fn serial(&self) -> &str {
        self.header_str("serial")
    }

    pub fn nonce(&self) -> &str {
        self.header_str("nonce")
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn device_session_request_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::DeviceSessionRequest,
        primary_key: &[],
        required: &[
            ("brand-id", HeaderCheck::NonEmptyString),
            ("model", HeaderCheck::NonEmptyString),
            ("serial", HeaderCheck::NonEmptyString),
            ("nonce", HeaderCheck::NonEmptyString),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[],
        body: BodyPolicy::Forbidden,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: false,
        assemble: assemble_device_session_request,
        consistency: None,
    }
}

fn assemble_device_session_request(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let timestamp = check_rfc3339_date(base.headers(), "timestamp")?;
    Ok(Assertion::DeviceSessionRequest(DeviceSessionRequest {
        base,
        timestamp,
    }))
}
