//! # Asserts Core
//!
//! Pure primitives for signed assertions: keys, headers, type schemas, the
//! text codec and trust chain verification.
//!
//! This crate contains no storage. Everything here is computation over
//! bytes and keys, safe to share between threads.
//!
//! ## Key Types
//!
//! - [`Assertion`] - A decoded, validated assertion of any known type
//! - [`AssertionType`] - The closed set of assertion kinds
//! - [`TypeRegistry`] - Schemas for each kind, injectable for testing
//! - [`PublicKey`] / [`PrivateKey`] - Ed25519 keys identified by SHA3-384
//! - [`KeyResolver`] - Source of account keys for [`verify`]
//!
//! ## Encoding
//!
//! Assertions travel as a header block, an optional body and a signature.
//! See the [`codec`] module.

pub mod assertion;
pub mod checks;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod headers;
pub mod registry;
pub mod sign;
pub mod types;
pub mod verify;

pub use assertion::{Assertion, AssertionBase, AssertionType};
pub use codec::{decode, decode_with, encode, Decoder, Encoder};
pub use crypto::{
    decode_private_key, decode_public_key, encode_digest, encode_private_key, encode_public_key,
    DigestAlgorithm, PrivateKey, PublicKey, Sha3_384Digest,
};
pub use error::{ConsistencyError, CryptoError, DecodeError, SchemaError, SignError, VerifyError};
pub use headers::{HeaderError, HeaderValue, Headers};
pub use registry::{
    standard_registry, AssertionLookup, BodyPolicy, HeaderCheck, TypeDescriptor, TypeRegistry,
    DEFAULT_MAX_BODY_SIZE,
};
pub use sign::{sign, sign_with, sign_without_authority};
pub use types::{
    Account, AccountKey, DeviceSessionRequest, Model, Repair, Serial, SerialRequest,
    SnapDeclaration, SnapRevision, SystemUser, Validation,
};
pub use verify::{signature_check, verify, KeyResolver, KeySet, MAX_CHAIN_DEPTH};
