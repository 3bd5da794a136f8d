//! Assertion: the signed, typed, revisioned document.
//!
//! Every assertion shares an [`AssertionBase`] holding the parsed headers and
//! the exact bytes that were signed. Typed documents wrap the base and expose
//! their own accessors; [`Assertion`] is the closed union over all of them.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::headers::{HeaderValue, Headers};
use crate::types::{
    Account, AccountKey, DeviceSessionRequest, Model, Repair, Serial, SerialRequest,
    SnapDeclaration, SnapRevision, SystemUser,
};

/// The kind of assertion, determining its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionType {
    Account,
    AccountKey,
    Model,
    Serial,
    SerialRequest,
    DeviceSessionRequest,
    SnapDeclaration,
    SnapRevision,
    Repair,
    SystemUser,
}

impl AssertionType {
    pub const ALL: [AssertionType; 10] = [
        Self::Account,
        Self::AccountKey,
        Self::Model,
        Self::Serial,
        Self::SerialRequest,
        Self::DeviceSessionRequest,
        Self::SnapDeclaration,
        Self::SnapRevision,
        Self::Repair,
        Self::SystemUser,
    ];

    /// The name used in the `type` header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::AccountKey => "account-key",
            Self::Model => "model",
            Self::Serial => "serial",
            Self::SerialRequest => "serial-request",
            Self::DeviceSessionRequest => "device-session-request",
            Self::SnapDeclaration => "snap-declaration",
            Self::SnapRevision => "snap-revision",
            Self::Repair => "repair",
            Self::SystemUser => "system-user",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for AssertionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The parts common to every assertion.
///
/// Built only by the registry's assembly, so the derived fields always agree
/// with the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionBase {
    kind: AssertionType,
    headers: Headers,
    body: Bytes,
    content: Bytes,
    signature: Bytes,
    revision: u64,
    primary_key: Vec<String>,
    sign_key_id: String,
}

impl AssertionBase {
    pub(crate) fn new(
        kind: AssertionType,
        headers: Headers,
        body: Bytes,
        content: Bytes,
        signature: Bytes,
        revision: u64,
        primary_key: Vec<String>,
    ) -> Self {
        let sign_key_id = headers
            .get_str("sign-key-sha3-384")
            .unwrap_or_default()
            .to_string();
        Self {
            kind,
            headers,
            body,
            content,
            signature,
            revision,
            primary_key,
            sign_key_id,
        }
    }

    pub fn kind(&self) -> AssertionType {
        self.kind
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// A string header, `""` when absent.
    pub fn header_str(&self, name: &str) -> &str {
        self.headers.get_str(name).unwrap_or_default()
    }

    /// The signing authority; `None` for self-signed types.
    pub fn authority_id(&self) -> Option<&str> {
        self.headers.get_str("authority-id").filter(|a| !a.is_empty())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Primary key values in the schema's declared order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// The id of the key that signed this assertion.
    pub fn sign_key_id(&self) -> &str {
        &self.sign_key_id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The exact bytes covered by the signature.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Content and signature, as needed to check the signature.
    pub fn signing_parts(&self) -> (&[u8], &[u8]) {
        (&self.content, &self.signature)
    }

    /// The headers rendered as JSON, preserving order.
    pub fn headers_json(&self) -> Value {
        Value::Object(map_json(&self.headers))
    }
}

fn map_json(headers: &Headers) -> Map<String, Value> {
    headers
        .iter()
        .map(|(name, value)| (name.to_string(), value_json(value)))
        .collect()
}

fn value_json(value: &HeaderValue) -> Value {
    match value {
        HeaderValue::String(s) => Value::String(s.clone()),
        HeaderValue::List(items) => Value::Array(items.iter().map(value_json).collect()),
        HeaderValue::Map(map) => Value::Object(map_json(map)),
    }
}

/// Gives a typed assertion the base accessors.
macro_rules! impl_base_deref {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Deref for $ty {
                type Target = AssertionBase;

                fn deref(&self) -> &AssertionBase {
                    &self.base
                }
            }
        )*
    };
}

impl_base_deref!(
    Account,
    AccountKey,
    Model,
    Serial,
    SerialRequest,
    DeviceSessionRequest,
    SnapDeclaration,
    SnapRevision,
    Repair,
    SystemUser,
);

/// A decoded and validated assertion of any known type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    Account(Account),
    AccountKey(AccountKey),
    Model(Model),
    Serial(Serial),
    SerialRequest(SerialRequest),
    DeviceSessionRequest(DeviceSessionRequest),
    SnapDeclaration(SnapDeclaration),
    SnapRevision(SnapRevision),
    Repair(Repair),
    SystemUser(SystemUser),
}

macro_rules! accessors {
    ($($variant:ident => $as_fn:ident),* $(,)?) => {
        impl Assertion {
            pub fn base(&self) -> &AssertionBase {
                match self {
                    $(Self::$variant(a) => &a.base,)*
                }
            }

            $(
                pub fn $as_fn(&self) -> Option<&$variant> {
                    match self {
                        Self::$variant(a) => Some(a),
                        _ => None,
                    }
                }
            )*
        }
    };
}

accessors!(
    Account => as_account,
    AccountKey => as_account_key,
    Model => as_model,
    Serial => as_serial,
    SerialRequest => as_serial_request,
    DeviceSessionRequest => as_device_session_request,
    SnapDeclaration => as_snap_declaration,
    SnapRevision => as_snap_revision,
    Repair => as_repair,
    SystemUser => as_system_user,
);

impl Assertion {
    pub fn into_account_key(self) -> Option<AccountKey> {
        match self {
            Self::AccountKey(key) => Some(key),
            _ => None,
        }
    }

    /// The full encoded form: content, a blank line, then the signature.
    pub fn encode(&self) -> Vec<u8> {
        let base = self.base();
        let mut out = Vec::with_capacity(base.content.len() + 2 + base.signature.len());
        out.extend_from_slice(&base.content);
        out.extend_from_slice(b"\n\n");
        out.extend_from_slice(&base.signature);
        out
    }
}

impl Deref for Assertion {
    type Target = AssertionBase;

    fn deref(&self) -> &AssertionBase {
        self.base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        for kind in AssertionType::ALL {
            assert_eq!(AssertionType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AssertionType::from_name("snap-build"), None);
        assert_eq!(AssertionType::SerialRequest.to_string(), "serial-request");
    }

    #[test]
    fn test_headers_json_keeps_order() {
        let mut headers = Headers::new();
        headers.insert("type", "repair");
        headers.insert("series", HeaderValue::list(["16"]));
        headers.insert("body-length", "7");
        let base = AssertionBase::new(
            AssertionType::Repair,
            headers,
            Bytes::new(),
            Bytes::new(),
            Bytes::new(),
            0,
            Vec::new(),
        );
        assert_eq!(
            base.headers_json().to_string(),
            r#"{"type":"repair","series":["16"],"body-length":"7"}"#
        );
    }
}
