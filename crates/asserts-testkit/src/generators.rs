//! Proptest generators for property-based testing.

use proptest::prelude::*;

use asserts_core::{Assertion, AssertionType, HeaderValue, Headers, PrivateKey};

use crate::fixtures::TIMESTAMP;

/// Generate a random private key.
pub fn private_key() -> impl Strategy<Value = PrivateKey> {
    any::<[u8; 32]>().prop_map(|seed| PrivateKey::from_seed(&seed))
}

/// A single-line header value that is never empty.
pub fn header_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 .,_+=/-]{0,40}".prop_map(String::from)
}

/// A header value spanning several lines.
pub fn multiline_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9][a-z0-9 ]{0,12}", 2..5).prop_map(|lines| lines.join("\n"))
}

/// A list of single-line values, possibly empty.
pub fn string_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(header_text(), 0..4)
}

/// A body of printable text, possibly empty.
pub fn body(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range(' ', '~'), 0..=max_len)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Parameters for generating a repair assertion.
#[derive(Debug, Clone)]
pub struct RepairParams {
    pub key: PrivateKey,
    pub brand_id: String,
    pub repair_id: u64,
    pub revision: u64,
    pub summary: String,
    pub models: Vec<String>,
    pub series: Vec<String>,
    pub disabled: Option<bool>,
    pub script: String,
}

impl Arbitrary for RepairParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            private_key(),
            "[a-z][a-z0-9-]{1,15}",
            1u64..=10_000u64,
            0u64..=50u64,
            prop_oneof![header_text(), multiline_text()],
            string_list(),
            string_list(),
            any::<Option<bool>>(),
            body(200),
        )
            .prop_map(
                |(key, brand_id, repair_id, revision, summary, models, series, disabled, script)| {
                    RepairParams {
                        key,
                        brand_id,
                        repair_id,
                        revision,
                        summary,
                        models,
                        series,
                        disabled,
                        script,
                    }
                },
            )
            .boxed()
    }
}

/// Sign a repair assertion from parameters.
pub fn repair_from_params(params: &RepairParams) -> Assertion {
    let mut headers = Headers::new();
    headers.insert("authority-id", params.brand_id.as_str());
    headers.insert("brand-id", params.brand_id.as_str());
    headers.insert("repair-id", params.repair_id.to_string());
    headers.insert("revision", params.revision.to_string());
    headers.insert("summary", params.summary.as_str());
    headers.insert("timestamp", TIMESTAMP);
    headers.insert("models", HeaderValue::list(params.models.iter().cloned()));
    headers.insert("series", HeaderValue::list(params.series.iter().cloned()));
    if let Some(disabled) = params.disabled {
        headers.insert("disabled", disabled.to_string());
    }
    asserts_core::sign(
        AssertionType::Repair,
        headers,
        params.script.as_bytes(),
        &params.key,
    )
    .unwrap()
}
