use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{
    check_authority_matches_brand, check_email, check_hashed_password, check_rfc3339_date,
    check_string_list, check_string_matches,
};
use crate::error::SchemaError;
use crate::registry::{BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE};

static VALID_USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][-a-z0-9+._]*$").expect("static regex"));

/// A local system user a brand allows on its devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemUser {
    pub(crate) base: AssertionBase,
    series: Vec<String>,
    models: Vec<String>,
    ssh_keys: Vec<String>,
    password: Option<String>,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
}

impl SystemUser {
    pub fn brand_id(&self) -> &str {
        self.header_str("brand-id")
    }

    pub fn email(&self) -> &str {
        self.header_str("email")
    }

    pub fn username(&self) -> &str {
        self.header_str("username")
    }

    pub fn name(&self) -> Option<&str> {
        self.headers().get_str("name")
    }

    /// The crypt(3) password hash, if set.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn series(&self) -> &[String] {
        &self.series
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn ssh_keys(&self) -> &[String] {
        &self.ssh_keys
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    pub fn until(&self) -> DateTime<Utc> {
        self.until
    }

    pub fn valid_at(&self, t: DateTime<Utc>) -> bool {
        self.since <= t && t < self.until
    }
}

pub(crate) fn descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::SystemUser,
        primary_key: &["brand-id", "email"],
        required: &[
            ("username", HeaderCheck::NonEmptyString),
            ("since", HeaderCheck::Date),
            ("until", HeaderCheck::Date),
        ],
        optional: &[
            ("name", HeaderCheck::String),
            ("password", HeaderCheck::String),
            ("series", HeaderCheck::StringList),
            ("models", HeaderCheck::StringList),
            ("ssh-keys", HeaderCheck::StringList),
        ],
        body: BodyPolicy::Forbidden,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble,
        consistency: None,
    }
}

fn assemble(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let headers = base.headers();
    check_authority_matches_brand(headers, "system-user")?;
    check_email(headers, "email")?;
    check_string_matches(headers, "username", &VALID_USERNAME)?;
    let password = match headers.contains("password") {
        true => Some(check_hashed_password(headers, "password")?),
        false => None,
    };
    let series = check_string_list(headers, "series")?;
    let models = check_string_list(headers, "models")?;
    let ssh_keys = check_string_list(headers, "ssh-keys")?;
    let since = check_rfc3339_date(headers, "since")?;
    let until = check_rfc3339_date(headers, "until")?;
    if until <= since {
        return Err(SchemaError::new("'until' time must be after 'since' time"));
    }
    Ok(Assertion::SystemUser(SystemUser {
        base,
        series,
        models,
        ssh_keys,
        password,
        since,
        until,
    }))
}
