//! Header validators shared by the type assemblers.
//!
//! Every validator names the offending header in its message, quoted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::crypto::{decode_public_key, DigestAlgorithm, PublicKey};
use crate::error::SchemaError;
use crate::headers::{HeaderValue, Headers};

type Result<T> = std::result::Result<T, SchemaError>;

pub fn check_exists<'a>(headers: &'a Headers, name: &str) -> Result<&'a HeaderValue> {
    headers
        .get(name)
        .ok_or_else(|| SchemaError::new(format!("{name:?} header is mandatory")))
}

fn as_string<'a>(value: &'a HeaderValue, name: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::new(format!("{name:?} header must be a string")))
}

pub fn check_string<'a>(headers: &'a Headers, name: &str) -> Result<&'a str> {
    as_string(check_exists(headers, name)?, name)
}

pub fn check_not_empty_string<'a>(headers: &'a Headers, name: &str) -> Result<&'a str> {
    let s = check_string(headers, name)?;
    if s.is_empty() {
        return Err(SchemaError::new(format!("{name:?} header should not be empty")));
    }
    Ok(s)
}

pub fn check_optional_string<'a>(headers: &'a Headers, name: &str) -> Result<Option<&'a str>> {
    headers.get(name).map(|v| as_string(v, name)).transpose()
}

/// A mandatory string matching `pattern`.
pub fn check_string_matches<'a>(headers: &'a Headers, name: &str, pattern: &Regex) -> Result<&'a str> {
    let s = check_not_empty_string(headers, name)?;
    if !pattern.is_match(s) {
        return Err(SchemaError::new(format!(
            "{name:?} header contains invalid characters: {s:?}"
        )));
    }
    Ok(s)
}

/// A primary-key component: a non-empty string without '/'.
pub fn check_primary_key<'a>(headers: &'a Headers, name: &str) -> Result<&'a str> {
    let s = check_not_empty_string(headers, name)?;
    if s.contains('/') {
        return Err(SchemaError::new(format!(
            "{name:?} primary key header cannot contain '/'"
        )));
    }
    Ok(s)
}

/// An optional list of strings; absent means empty.
pub fn check_string_list(headers: &Headers, name: &str) -> Result<Vec<String>> {
    check_string_list_matches(headers, name, None)
}

pub fn check_string_list_matches(
    headers: &Headers,
    name: &str,
    pattern: Option<&Regex>,
) -> Result<Vec<String>> {
    let Some(value) = headers.get(name) else {
        return Ok(Vec::new());
    };
    let not_a_list = || SchemaError::new(format!("{name:?} header must be a list of strings"));
    let items = value.as_list().ok_or_else(not_a_list)?;
    items
        .iter()
        .map(|item| {
            let s = item.as_str().ok_or_else(not_a_list)?;
            if let Some(pattern) = pattern {
                if !pattern.is_match(s) {
                    return Err(SchemaError::new(format!(
                        "{name:?} header contains an invalid element: {s:?}"
                    )));
                }
            }
            Ok(s.to_string())
        })
        .collect()
}

pub fn check_rfc3339_date(headers: &Headers, name: &str) -> Result<DateTime<Utc>> {
    let s = check_not_empty_string(headers, name)?;
    parse_rfc3339(s, name)
}

pub fn check_optional_rfc3339_date(headers: &Headers, name: &str) -> Result<Option<DateTime<Utc>>> {
    match headers.get(name) {
        None => Ok(None),
        Some(_) => check_rfc3339_date(headers, name).map(Some),
    }
}

fn parse_rfc3339(s: &str, name: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SchemaError::new(format!("{name:?} header is not a RFC3339 date: {e}")))
}

/// A decimal integer, `default` when absent.
pub fn check_int_with_default(headers: &Headers, name: &str, default: i64) -> Result<i64> {
    let Some(value) = headers.get(name) else {
        return Ok(default);
    };
    let s = as_string(value, name)?;
    let n: i64 = s
        .parse()
        .map_err(|_| SchemaError::new(format!("{name:?} header is not an integer: {s}")))?;
    if s.starts_with('+') || (s.len() > 1 && (s.starts_with('0') || s.starts_with("-0"))) {
        return Err(SchemaError::new(format!(
            "{name:?} header has invalid prefix zeros: {s}"
        )));
    }
    Ok(n)
}

pub fn check_int(headers: &Headers, name: &str) -> Result<i64> {
    check_exists(headers, name)?;
    check_int_with_default(headers, name, 0)
}

/// A `true`/`false` flag, false when absent.
pub fn check_optional_bool(headers: &Headers, name: &str) -> Result<bool> {
    match check_optional_string(headers, name)? {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(_) => Err(SchemaError::new(format!(
            "{name:?} header must be 'true' or 'false'"
        ))),
    }
}

/// A url-safe base64 digest of the algorithm's length.
pub fn check_digest(headers: &Headers, name: &str, algorithm: DigestAlgorithm) -> Result<Vec<u8>> {
    let s = check_not_empty_string(headers, name)?;
    let digest = URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| SchemaError::new(format!("{name:?} header cannot be decoded: {e}")))?;
    if digest.len() != algorithm.size() {
        return Err(SchemaError::new(format!(
            "{name:?} header does not have the expected bit length: {}",
            digest.len() * 8
        )));
    }
    Ok(digest)
}

pub fn check_public_key(headers: &Headers, name: &str) -> Result<PublicKey> {
    let encoded = check_not_empty_string(headers, name)?;
    Ok(decode_public_key(encoded.as_bytes())?)
}

/// Brand-signed types must carry `authority-id == brand-id`.
pub fn check_authority_matches_brand(headers: &Headers, type_name: &str) -> Result<()> {
    let brand_id = check_not_empty_string(headers, "brand-id")?;
    let authority_id = headers.get_str("authority-id").unwrap_or_default();
    if brand_id != authority_id {
        return Err(SchemaError::new(format!(
            "authority-id and brand-id must match, {type_name} assertions are expected to be signed by the brand: {authority_id:?} != {brand_id:?}"
        )));
    }
    Ok(())
}

static SALT_AND_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9./]+$").expect("static regex"));

/// A crypt(3) hash of the form `$id$salt$hash` with id 6 or higher.
pub fn check_hashed_password(headers: &Headers, name: &str) -> Result<String> {
    let pw = check_optional_string(headers, name)?.unwrap_or_default();
    let parts: Vec<&str> = pw.splitn(4, '$').collect();
    if parts.len() != 4 {
        return Err(SchemaError::new(format!(
            "{name:?} header must be a hashed password of the form \"$integer-id$salt$hash\", see crypt(3)"
        )));
    }
    let id: i64 = parts[1].parse().map_err(|_| {
        SchemaError::new(format!(
            "{name:?} header must start with \"$integer-id$\", got {:?}",
            parts[1]
        ))
    })?;
    if id < 6 {
        return Err(SchemaError::new(format!(
            "{name:?} header only supports $id$ values of 6 (sha512crypt) or higher"
        )));
    }
    if !SALT_AND_HASH.is_match(parts[2]) {
        return Err(SchemaError::new(format!(
            "{name:?} header has invalid chars in salt {:?}",
            parts[2]
        )));
    }
    if !SALT_AND_HASH.is_match(parts[3]) {
        return Err(SchemaError::new(format!(
            "{name:?} header has invalid chars in hash {:?}",
            parts[3]
        )));
    }
    Ok(pw.to_string())
}

static LOCAL_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$")
        .expect("static regex")
});

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .expect("static regex")
});

/// Parse an RFC 5322 address, either bare or as `Display Name <addr>`.
pub fn parse_email_address(s: &str) -> std::result::Result<&str, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("no address".into());
    }
    let addr = match (s.find('<'), s.strip_suffix('>')) {
        (Some(open), Some(inner)) => &inner[open + 1..],
        (Some(_), None) => return Err("unclosed angle-addr".into()),
        _ => s,
    };
    let (local, domain) = addr
        .rsplit_once('@')
        .ok_or_else(|| "missing '@' or angle-addr".to_string())?;
    if !LOCAL_PART.is_match(local) {
        return Err(format!("invalid local part {local:?}"));
    }
    if !DOMAIN.is_match(domain) {
        return Err(format!("invalid domain {domain:?}"));
    }
    Ok(addr)
}

pub fn check_email(headers: &Headers, name: &str) -> Result<String> {
    let s = check_not_empty_string(headers, name)?;
    parse_email_address(s).map(str::to_string).map_err(|e| {
        SchemaError::new(format!(
            "{name:?} header must be a RFC 5322 compliant email address: {e}"
        ))
    })
}
