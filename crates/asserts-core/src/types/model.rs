use chrono::{DateTime, Utc};

use crate::assertion::{Assertion, AssertionBase, AssertionType};
use crate::checks::{check_authority_matches_brand, check_rfc3339_date, check_string_list};
use crate::error::{ConsistencyError, SchemaError};
use crate::registry::{
    AssertionLookup, BodyPolicy, HeaderCheck, TypeDescriptor, DEFAULT_MAX_BODY_SIZE,
};
use crate::types::AccountKey;

/// Describes a device model, signed by its brand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub(crate) base: AssertionBase,
    allowed_modes: Vec<String>,
    required_snaps: Vec<String>,
    timestamp: DateTime<Utc>,
}

impl Model {
    pub fn series(&self) -> &str {
        self.header_str("series")
    }

    pub fn brand_id(&self) -> &str {
        self.header_str("brand-id")
    }

    pub fn model(&self) -> &str {
        self.header_str("model")
    }

    pub fn core(&self) -> &str {
        self.header_str("core")
    }

    pub fn architecture(&self) -> &str {
        self.header_str("architecture")
    }

    pub fn gadget(&self) -> &str {
        self.header_str("gadget")
    }

    pub fn kernel(&self) -> &str {
        self.header_str("kernel")
    }

    pub fn store(&self) -> &str {
        self.header_str("store")
    }

    pub fn class(&self) -> &str {
        self.header_str("class")
    }

    pub fn allowed_modes(&self) -> &[String] {
        &self.allowed_modes
    }

    pub fn required_snaps(&self) -> &[String] {
        &self.required_snaps
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

pub(crate) fn descriptor() -> TypeDescriptor {
    TypeDescriptor {
        kind: AssertionType::Model,
        primary_key: &["series", "brand-id", "model"],
        required: &[
            ("core", HeaderCheck::NonEmptyString),
            ("architecture", HeaderCheck::NonEmptyString),
            ("gadget", HeaderCheck::NonEmptyString),
            ("kernel", HeaderCheck::NonEmptyString),
            ("store", HeaderCheck::NonEmptyString),
            ("class", HeaderCheck::NonEmptyString),
            ("timestamp", HeaderCheck::Date),
        ],
        optional: &[
            ("allowed-modes", HeaderCheck::StringList),
            ("required-snaps", HeaderCheck::StringList),
        ],
        body: BodyPolicy::Optional,
        max_body_size: DEFAULT_MAX_BODY_SIZE,
        authority: true,
        assemble,
        consistency: Some(consistency),
    }
}

fn assemble(base: AssertionBase) -> Result<Assertion, SchemaError> {
    check_authority_matches_brand(base.headers(), "model")?;
    let allowed_modes = check_string_list(base.headers(), "allowed-modes")?;
    let required_snaps = check_string_list(base.headers(), "required-snaps")?;
    let timestamp = check_rfc3339_date(base.headers(), "timestamp")?;
    Ok(Assertion::Model(Model {
        base,
        allowed_modes,
        required_snaps,
        timestamp,
    }))
}

fn consistency(
    doc: &Assertion,
    signing_key: Option<&AccountKey>,
    _lookup: &dyn AssertionLookup,
) -> Result<(), ConsistencyError> {
    let valid = match (doc.as_model(), signing_key) {
        (Some(model), Some(key)) => key.is_key_valid_at(model.timestamp()),
        _ => false,
    };
    if !valid {
        return Err(ConsistencyError::violation(
            "model assertion timestamp outside of signing key validity",
        ));
    }
    Ok(())
}
