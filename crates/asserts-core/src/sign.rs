//! Building and signing new assertions.

use bytes::Bytes;

use crate::assertion::{Assertion, AssertionType};
use crate::checks::check_int_with_default;
use crate::crypto::PrivateKey;
use crate::error::{SchemaError, SignError};
use crate::headers::{parse_headers, write_entry, HeaderValue, Headers};
use crate::registry::{standard_registry, TypeRegistry};

/// Headers placed by signing rather than taken in order from the caller.
const FIXED: [&str; 5] = [
    "type",
    "authority-id",
    "revision",
    "body-length",
    "sign-key-sha3-384",
];

/// Sign an assertion of a type that has an authority.
pub fn sign(
    kind: AssertionType,
    headers: Headers,
    body: &[u8],
    key: &PrivateKey,
) -> Result<Assertion, SignError> {
    sign_with(standard_registry(), kind, headers, body, key)
}

/// Sign a self-signed assertion, such as a serial request.
pub fn sign_without_authority(
    kind: AssertionType,
    headers: Headers,
    body: &[u8],
    key: &PrivateKey,
) -> Result<Assertion, SignError> {
    let registry = standard_registry();
    if registry.get(kind).is_some_and(|d| d.authority) {
        return Err(SignError::NeedsAuthority(kind.name()));
    }
    assemble_and_sign(registry, kind, headers, body, key)
}

/// [`sign`] against a custom registry.
pub fn sign_with(
    registry: &TypeRegistry,
    kind: AssertionType,
    headers: Headers,
    body: &[u8],
    key: &PrivateKey,
) -> Result<Assertion, SignError> {
    if registry.get(kind).is_some_and(|d| !d.authority) {
        return Err(SignError::SelfSigned(kind.name()));
    }
    assemble_and_sign(registry, kind, headers, body, key)
}

fn assemble_and_sign(
    registry: &TypeRegistry,
    kind: AssertionType,
    headers: Headers,
    body: &[u8],
    key: &PrivateKey,
) -> Result<Assertion, SignError> {
    let primary_key: &[&str] = match registry.get(kind) {
        Some(d) => d.primary_key,
        None => &[],
    };

    let revision = check_int_with_default(&headers, "revision", 0).map_err(SignError::Headers)?;
    if revision < 0 {
        return Err(SignError::Headers(SchemaError::new(format!(
            "\"revision\" header must be >=0: {revision}"
        ))));
    }

    let mut ordered: Vec<(&str, HeaderValue)> = vec![("type", kind.name().into())];
    if let Some(authority) = headers.get("authority-id") {
        ordered.push(("authority-id", authority.clone()));
    }
    if revision > 0 {
        ordered.push(("revision", revision.to_string().into()));
    }
    for &name in primary_key {
        if let Some(value) = headers.get(name) {
            ordered.push((name, value.clone()));
        }
    }
    let mut rest: Vec<_> = headers
        .iter()
        .filter(|(name, _)| !FIXED.iter().chain(primary_key).any(|placed| placed == name))
        .collect();
    rest.sort_by(|a, b| a.0.cmp(b.0));
    ordered.extend(rest.into_iter().map(|(name, value)| (name, value.clone())));
    if !body.is_empty() {
        ordered.push(("body-length", body.len().to_string().into()));
    }
    let key_id = key.public_key().id();
    ordered.push(("sign-key-sha3-384", key_id.into()));

    let mut text = String::new();
    for (name, value) in &ordered {
        write_entry(&mut text, &format!("{name}:"), value, 0);
    }
    let head = text.trim_start_matches('\n');
    let final_headers = parse_headers(head.as_bytes())
        .map_err(|e| SignError::Headers(SchemaError::new(e.to_string())))?;

    let mut content = head.as_bytes().to_vec();
    if !body.is_empty() {
        content.extend_from_slice(b"\n\n");
        content.extend_from_slice(body);
    }
    let signature = key.sign(&content);

    registry
        .assemble(
            final_headers,
            Bytes::copy_from_slice(body),
            Bytes::from(content),
            Bytes::from(signature),
            None,
        )
        .map_err(|source| SignError::Assemble {
            type_name: kind.name(),
            source,
        })
}
