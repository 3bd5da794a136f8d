//! Error types for assertion decoding, signing and verification.
//!
//! Messages are matched verbatim by tooling, so their wording is part of the
//! public contract.

use thiserror::Error;

use crate::headers::HeaderError;

/// Errors from key, digest and signature encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("cannot decode public key: {0}")]
    DecodePublicKey(String),

    #[error("cannot decode private key: {0}")]
    DecodePrivateKey(String),

    #[error("cannot decode signature: {0}")]
    DecodeSignature(String),

    #[error("signature does not match content")]
    SignatureMismatch,

    #[error("hash digest by {algorithm} should be {expected} bytes")]
    DigestLength {
        algorithm: &'static str,
        expected: usize,
    },
}

/// A schema violation found while assembling a typed assertion.
///
/// Carries the bare message; the codec adds the `assertion <type>: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SchemaError(pub String);

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<CryptoError> for SchemaError {
    fn from(e: CryptoError) -> Self {
        Self(e.to_string())
    }
}

/// Errors that make a byte sequence fail to decode into an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("assertion content/signature separator not found")]
    MissingSignatureSeparator,

    #[error("parsing assertion headers: {0}")]
    Headers(#[from] HeaderError),

    #[error("assertion body length and declared body-length don't match: {actual} != {declared}")]
    BodyLengthMismatch { actual: usize, declared: i64 },

    #[error("assertion body length {length} exceeds maximum body size {max} for {type_name:?} assertions")]
    BodyTooLarge {
        length: usize,
        max: usize,
        type_name: &'static str,
    },

    #[error("unknown assertion type: {0:?}")]
    UnknownType(String),

    #[error("empty assertion signature")]
    EmptySignature,

    /// A header problem detected before the type is known.
    #[error("assertion: {0}")]
    Generic(SchemaError),

    /// A header or structure problem specific to a type.
    #[error("assertion {type_name}: {source}")]
    Schema {
        type_name: &'static str,
        source: SchemaError,
    },

    #[error("cannot read assertion stream: {0}")]
    Io(String),

    #[error("unexpected end of assertion stream: {0}")]
    UnexpectedEof(&'static str),
}

/// Errors from building and signing a new assertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("{0}")]
    Headers(SchemaError),

    #[error("cannot assemble assertion {type_name}: {source}")]
    Assemble {
        type_name: &'static str,
        source: DecodeError,
    },

    #[error("cannot sign assertions needing a definite authority without one: {0:?}")]
    NeedsAuthority(&'static str),

    #[error("cannot sign {0:?} assertions with an authority, they are self-signed")]
    SelfSigned(&'static str),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors from resolving a signing key and checking a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("no matching public key {key_id:?} for signature by {authority_id:?}")]
    UnresolvedKey {
        key_id: String,
        authority_id: String,
    },

    #[error("error finding matching public key for signature: found public key {key_id:?} from {found:?} but expected it from: {expected}")]
    AccountMismatch {
        key_id: String,
        found: String,
        expected: String,
    },

    #[error("chain of account-key assertions for {key_id:?} exceeds maximum depth {max}")]
    ChainTooDeep { key_id: String, max: usize },

    #[error("failed signature verification: {0}")]
    BadSignature(CryptoError),

    #[error("device key does not match included signing key id")]
    DeviceKeyMismatch,

    #[error("{0:?} assertion does not embed its signing key")]
    NoEmbeddedKey(&'static str),

    #[error("cannot check no-authority assertion type {0:?}")]
    NoAuthority(&'static str),

    #[error("cannot resolve signing key: {0}")]
    Resolver(String),
}

/// A cross-document rule violated at add time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("{0}")]
    Violation(String),

    #[error("cannot look up {type_name} assertion: {message}")]
    Lookup {
        type_name: &'static str,
        message: String,
    },
}

impl ConsistencyError {
    pub fn violation(message: impl Into<String>) -> Self {
        Self::Violation(message.into())
    }
}

/// Result type for decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;
