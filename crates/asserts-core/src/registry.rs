//! Type schema registry.
//!
//! A [`TypeRegistry`] maps each [`AssertionType`] to a [`TypeDescriptor`]:
//! its primary key, header checks, body policy, size bound and the hooks
//! that build the typed document and check it against other assertions.
//!
//! Registries are plain immutable values. [`standard_registry`] is a shared
//! read-only instance of [`TypeRegistry::standard`]; callers wanting other
//! limits or a subset of types build their own and pass it by reference.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use once_cell::sync::Lazy;

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{
    check_digest, check_exists, check_int, check_int_with_default, check_not_empty_string,
    check_optional_bool, check_primary_key, check_public_key, check_rfc3339_date, check_string,
    check_string_list,
};
use crate::crypto::DigestAlgorithm;
use crate::error::{ConsistencyError, DecodeError, SchemaError};
use crate::headers::Headers;
use crate::types::{self, AccountKey};

/// Default upper bound on body sizes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Builds the typed document from a validated base.
pub type AssembleFn = fn(AssertionBase) -> Result<Assertion, SchemaError>;

/// Checks a document against the rest of the database.
///
/// Receives the key that signed the document, when there is one.
pub type ConsistencyFn =
    fn(&Assertion, Option<&AccountKey>, &dyn AssertionLookup) -> Result<(), ConsistencyError>;

/// Read access to known assertions, for consistency hooks.
pub trait AssertionLookup {
    /// Find the assertion of `kind` with exactly this primary key.
    fn find(
        &self,
        kind: AssertionType,
        primary_key: &[&str],
    ) -> Result<Option<Assertion>, ConsistencyError>;

    /// Whether `account_id` holds a directly trusted key.
    fn is_trusted_account(&self, account_id: &str) -> bool;
}

/// Whether an assertion type carries a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPolicy {
    Forbidden,
    Optional,
    Mandatory,
}

/// The shape a header value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    String,
    NonEmptyString,
    Date,
    StringList,
    Integer,
    Digest(DigestAlgorithm),
    PublicKey,
    Bool,
}

impl HeaderCheck {
    pub fn apply(self, headers: &Headers, name: &str) -> Result<(), SchemaError> {
        match self {
            Self::String => check_string(headers, name).map(drop),
            Self::NonEmptyString => check_not_empty_string(headers, name).map(drop),
            Self::Date => check_rfc3339_date(headers, name).map(drop),
            Self::StringList => check_string_list(headers, name).map(drop),
            Self::Integer => check_int(headers, name).map(drop),
            Self::Digest(algorithm) => check_digest(headers, name, algorithm).map(drop),
            Self::PublicKey => check_public_key(headers, name).map(drop),
            Self::Bool => check_optional_bool(headers, name).map(drop),
        }
    }
}

/// The schema of one assertion type.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    pub kind: AssertionType,
    /// Headers forming the primary key, in order.
    pub primary_key: &'static [&'static str],
    pub required: &'static [(&'static str, HeaderCheck)],
    /// Checked only when present.
    pub optional: &'static [(&'static str, HeaderCheck)],
    pub body: BodyPolicy,
    pub max_body_size: usize,
    /// False for self-signed types, which must not carry `authority-id`.
    pub authority: bool,
    pub assemble: AssembleFn,
    pub consistency: Option<ConsistencyFn>,
}

impl TypeDescriptor {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Run the consistency hook, if the type has one.
    pub fn check_consistency(
        &self,
        doc: &Assertion,
        signing_key: Option<&AccountKey>,
        lookup: &dyn AssertionLookup,
    ) -> Result<(), ConsistencyError> {
        match self.consistency {
            Some(check) => check(doc, signing_key, lookup),
            None => Ok(()),
        }
    }

    fn check_headers(&self, headers: &Headers, body: &[u8]) -> Result<(), SchemaError> {
        for (name, check) in self.required {
            check_exists(headers, name)?;
            check.apply(headers, name)?;
        }
        for (name, check) in self.optional {
            if headers.contains(name) {
                check.apply(headers, name)?;
            }
        }
        match self.body {
            BodyPolicy::Forbidden if !body.is_empty() => Err(SchemaError::new("body must be empty")),
            BodyPolicy::Mandatory if body.is_empty() => Err(SchemaError::new("body must not be empty")),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("kind", &self.kind)
            .field("primary_key", &self.primary_key)
            .field("body", &self.body)
            .field("max_body_size", &self.max_body_size)
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

/// An immutable table of assertion type schemas.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<AssertionType, TypeDescriptor>,
}

static STANDARD: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::standard);

/// The shared registry of all standard types.
pub fn standard_registry() -> &'static TypeRegistry {
    &STANDARD
}

impl TypeRegistry {
    /// A registry with no types.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every standard type.
    pub fn standard() -> Self {
        types::descriptors()
            .into_iter()
            .fold(Self::empty(), Self::with_type)
    }

    /// Add or replace a type.
    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.insert(descriptor.kind, descriptor);
        self
    }

    pub fn without_type(mut self, kind: AssertionType) -> Self {
        self.types.remove(&kind);
        self
    }

    /// Override the body size bound of a registered type.
    pub fn with_max_body_size(mut self, kind: AssertionType, max: usize) -> Self {
        if let Some(descriptor) = self.types.get_mut(&kind) {
            descriptor.max_body_size = max;
        }
        self
    }

    pub fn get(&self, kind: AssertionType) -> Option<&TypeDescriptor> {
        self.types.get(&kind)
    }

    /// Look a type up by its `type` header name.
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        AssertionType::from_name(name).and_then(|kind| self.get(kind))
    }

    pub fn kinds(&self) -> impl Iterator<Item = AssertionType> + '_ {
        self.types.keys().copied()
    }

    /// Validate parsed parts and build the typed assertion.
    ///
    /// `max_body` overrides the type's own body size bound.
    pub fn assemble(
        &self,
        headers: Headers,
        body: Bytes,
        content: Bytes,
        signature: Bytes,
        max_body: Option<usize>,
    ) -> Result<Assertion, DecodeError> {
        let declared =
            check_int_with_default(&headers, "body-length", 0).map_err(DecodeError::Generic)?;
        if declared != body.len() as i64 {
            return Err(DecodeError::BodyLengthMismatch {
                actual: body.len(),
                declared,
            });
        }
        if std::str::from_utf8(&body).is_err() {
            return Err(DecodeError::Generic(SchemaError::new("body is not utf8")));
        }
        check_digest(&headers, "sign-key-sha3-384", DigestAlgorithm::Sha3_384)
            .map_err(DecodeError::Generic)?;

        let descriptor = {
            let name = check_not_empty_string(&headers, "type").map_err(DecodeError::Generic)?;
            self.lookup(name)
                .ok_or_else(|| DecodeError::UnknownType(name.to_string()))?
        };
        let type_name = descriptor.name();

        let max = max_body.unwrap_or(descriptor.max_body_size);
        if body.len() > max {
            return Err(DecodeError::BodyTooLarge {
                length: body.len(),
                max,
                type_name,
            });
        }

        if descriptor.authority {
            check_not_empty_string(&headers, "authority-id").map_err(DecodeError::Generic)?;
        } else if headers.contains("authority-id") {
            return Err(DecodeError::Generic(SchemaError::new(format!(
                "{type_name:?} assertion cannot have authority-id set"
            ))));
        }

        let schema = |source| DecodeError::Schema { type_name, source };

        let primary_key = descriptor
            .primary_key
            .iter()
            .map(|name| check_primary_key(&headers, name).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()
            .map_err(schema)?;

        let revision = check_int_with_default(&headers, "revision", 0).map_err(DecodeError::Generic)?;
        if revision < 0 {
            return Err(DecodeError::Generic(SchemaError::new(format!(
                "\"revision\" header must be >=0: {revision}"
            ))));
        }

        descriptor.check_headers(&headers, &body).map_err(schema)?;

        let base = AssertionBase::new(
            descriptor.kind,
            headers,
            body,
            content,
            signature,
            revision as u64,
            primary_key,
        );
        (descriptor.assemble)(base).map_err(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_has_every_type() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.kinds().collect::<Vec<_>>(), AssertionType::ALL);
        for kind in AssertionType::ALL {
            let descriptor = registry.get(kind).unwrap();
            assert_eq!(descriptor.kind, kind);
            assert_eq!(descriptor.max_body_size, DEFAULT_MAX_BODY_SIZE);
        }
    }

    #[test]
    fn test_self_signed_types() {
        let registry = standard_registry();
        let self_signed: Vec<_> = registry
            .kinds()
            .filter(|kind| !registry.get(*kind).unwrap().authority)
            .collect();
        assert_eq!(
            self_signed,
            [AssertionType::SerialRequest, AssertionType::DeviceSessionRequest]
        );
    }

    #[test]
    fn test_overrides() {
        let registry = TypeRegistry::standard()
            .with_max_body_size(AssertionType::Repair, 4)
            .without_type(AssertionType::SystemUser);
        assert_eq!(registry.get(AssertionType::Repair).unwrap().max_body_size, 4);
        assert!(registry.lookup("system-user").is_none());
        assert!(registry.lookup("model").is_some());
        assert!(registry.lookup("snap-build").is_none());
    }
}
