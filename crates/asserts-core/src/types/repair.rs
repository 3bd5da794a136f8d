use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{
    check_authority_matches_brand, check_optional_bool, check_rfc3339_date, check_string_list,
    check_string_matches,
};
use crate::error::SchemaError;
use crate::registry::{BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE};

static VALID_REPAIR_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]*$").expect("static regex"));

/// A brand-issued repair script, with the scope of devices it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub(crate) base: AssertionBase,
    id: u64,
    architectures: Vec<String>,
    series: Vec<String>,
    models: Vec<String>,
    disabled: bool,
    timestamp: DateTime<Utc>,
}

impl Repair {
    pub fn brand_id(&self) -> &str {
        self.header_str("brand-id")
    }

    pub fn repair_id(&self) -> u64 {
        self.id
    }

    pub fn summary(&self) -> &str {
        self.header_str("summary")
    }

    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    pub fn series(&self) -> &[String] {
        &self.series
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The script to run.
    pub fn script(&self) -> &[u8] {
        self.body()
    }
}

pub(crate) fn descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::Repair,
        primary_key: &["brand-id", "repair-id"],
        required: &[
            ("summary", HeaderCheck::NonEmptyString),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[
            ("architectures", HeaderCheck::StringList),
            ("series", HeaderCheck::StringList),
            ("models", HeaderCheck::StringList),
            ("disabled", HeaderCheck::Bool),
        ],
        body: BodyPolicy::Optional,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble,
        consistency: None,
    }
}

fn assemble(base: AssertionBase) -> Result<Assertion, SchemaError> {
    let headers = base.headers();
    check_authority_matches_brand(headers, "repair")?;
    let id = check_string_matches(headers, "repair-id", &VALID_REPAIR_ID)?
        .parse()
        .map_err(|e| SchemaError::new(format!("\"repair-id\" header is not a valid number: {e}")))?;
    let architectures = check_string_list(headers, "architectures")?;
    let series = check_string_list(headers, "series")?;
    let models = check_string_list(headers, "models")?;
    let disabled = check_optional_bool(headers, "disabled")?;
    let timestamp = check_rfc3339_date(headers, "timestamp")?;
    Ok(Assertion::Repair(Repair {
        base,
        id,
        architectures,
        series,
        models,
        disabled,
        timestamp,
    }))
}
