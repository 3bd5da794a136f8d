//! End-to-end scenarios over decoding, consistency and self-signed documents.

use asserts_core::{decode, encode, encode_public_key, signature_check, verify, KeySet};
use asserts_testkit::fixtures::{device_key, serial_request, TrustFixture};
use asserts_testkit::samples::{document, replace_header, MODEL_HEAD};

#[test]
fn model_decodes_with_every_field() {
    let doc = decode(document(MODEL_HEAD, "").as_bytes()).unwrap();
    let model = doc.as_model().unwrap();

    assert_eq!(model.series(), "16");
    assert_eq!(model.brand_id(), "brand-id1");
    assert_eq!(model.model(), "baz-3000");
    assert_eq!(model.core(), "core");
    assert_eq!(model.architecture(), "amd64");
    assert_eq!(model.gadget(), "brand-gadget");
    assert_eq!(model.kernel(), "baz-linux");
    assert_eq!(model.store(), "brand-store");
    assert_eq!(model.class(), "fixed");
    assert_eq!(model.timestamp().to_rfc3339(), "2017-03-30T12:22:16+00:00");
    assert!(model.allowed_modes().is_empty());
    assert!(model.required_snaps().is_empty());
    assert_eq!(doc.primary_key(), ["16", "brand-id1", "baz-3000"]);
}

#[test]
fn model_brand_must_match_authority() {
    let head = replace_header(MODEL_HEAD, "brand-id", "random");
    let err = decode(document(&head, "").as_bytes()).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"assertion model: authority-id and brand-id must match, model assertions are expected to be signed by the brand: "brand-id1" != "random""#
    );
}

#[test]
fn serial_device_key_must_match_its_id() {
    let device = device_key(0x30).public_key();
    let other = device_key(0x31).public_key();
    let head = format!(
        "type: serial\n\
         authority-id: brand-id1\n\
         brand-id: brand-id1\n\
         model: baz-3000\n\
         serial: 2700\n\
         device-key: {}\n\
         device-key-sha3-384: {}\n\
         timestamp: 2017-03-30T12:22:16Z",
        encode_public_key(&device),
        other.id()
    );
    let err = decode(document(&head, "").as_bytes()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "assertion serial: device key does not match provided key id"
    );
}

#[test]
fn model_outside_key_validity_is_inconsistent() {
    let fixture = TrustFixture::new();
    let brand = fixture.brand_with_validity("acme", 1, "2017-01-01T00:00:00Z", None);
    let db = fixture.database();
    for doc in brand.chain() {
        db.add(&doc).unwrap();
    }

    let early = brand.model("frobinator", "2016-06-01T00:00:00Z");
    let err = db.add(&early).unwrap_err();
    assert_eq!(
        err.to_string(),
        "model assertion timestamp outside of signing key validity"
    );

    let in_window = brand.model("frobinator", "2017-06-01T00:00:00Z");
    db.add(&in_window).unwrap();
}

#[test]
fn model_after_key_until_is_inconsistent() {
    let fixture = TrustFixture::new();
    let brand = fixture.brand_with_validity(
        "acme",
        1,
        "2016-01-01T00:00:00Z",
        Some("2017-01-01T00:00:00Z"),
    );

    let mut keys = KeySet::new();
    keys.add_trusted(fixture.root_account_key.clone().into_account_key().unwrap());
    keys.add(brand.account_key.clone().into_account_key().unwrap());

    let model = brand.model("frobinator", "2017-06-01T00:00:00Z");
    let signing_key = verify(&model, &keys).unwrap().unwrap();
    assert!(!signing_key.is_key_valid_at(model.as_model().unwrap().timestamp()));
}

#[test]
fn self_signed_request_roundtrip() {
    let device = device_key(0x40);
    let request = serial_request("brand-id1", "baz-3000", &device);

    let decoded = decode(&encode(&request)).unwrap();
    assert_eq!(decoded, request);

    let req = decoded.as_serial_request().unwrap();
    assert_eq!(req.brand_id(), "brand-id1");
    assert_eq!(req.model(), "baz-3000");
    assert_eq!(req.request_id(), "REQ-ID-1");
    assert_eq!(&decoded.body()[..], b"HW-DETAILS");
    signature_check(&decoded, req.device_key()).unwrap();

    assert_eq!(verify(&decoded, &KeySet::new()).unwrap(), None);
}

#[test]
fn self_signed_request_is_refused_by_database() {
    let fixture = TrustFixture::new();
    let db = fixture.database();
    let request = serial_request("brand-id1", "baz-3000", &device_key(0x40));

    let err = db.add(&request).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"cannot check no-authority assertion type "serial-request""#
    );
}
