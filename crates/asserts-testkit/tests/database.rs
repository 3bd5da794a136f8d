//! Database behaviour: checked adds, revisions, lookups and signing.

use asserts::{AssertionType, Database, DatabaseError};
use asserts_core::{Sha3_384Digest, VerifyError};
use asserts_testkit::fixtures::{device_key, headers, serial_headers, TrustFixture, TIMESTAMP};

fn with_brand(fixture: &TrustFixture, brand_id: &str, seed: u8) -> (Database, asserts_testkit::Brand) {
    let brand = fixture.brand(brand_id, seed);
    let db = fixture.database();
    for doc in brand.chain() {
        db.add(&doc).unwrap();
    }
    (db, brand)
}

#[test]
fn add_then_find() {
    let fixture = TrustFixture::new();
    let (db, brand) = with_brand(&fixture, "acme", 1);

    let repair = brand.repair("1", 0);
    db.add(&repair).unwrap();

    assert_eq!(db.find(AssertionType::Repair, &["acme", "1"]).unwrap(), repair);
    assert_eq!(
        db.find(AssertionType::Account, &["canonical"]).unwrap(),
        fixture.root_account
    );
    assert_eq!(db.find(AssertionType::Account, &["acme"]).unwrap(), brand.account);
}

#[test]
fn find_errors() {
    let fixture = TrustFixture::new();
    let (db, _brand) = with_brand(&fixture, "acme", 1);

    let err = db.find(AssertionType::Repair, &["acme", "9"]).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "repair assertion not found");

    let err = db.find(AssertionType::Repair, &["acme"]).unwrap_err();
    assert_eq!(err.to_string(), "must provide primary key: repair-id");
}

#[test]
fn find_many_by_headers() {
    let fixture = TrustFixture::new();
    let (db, acme) = with_brand(&fixture, "acme", 1);
    let globex = fixture.brand("globex", 2);
    for doc in globex.chain() {
        db.add(&doc).unwrap();
    }
    db.add(&acme.repair("1", 0)).unwrap();
    db.add(&acme.repair("2", 0)).unwrap();
    db.add(&globex.repair("1", 0)).unwrap();

    let found = db
        .find_many(AssertionType::Repair, &[("brand-id", "acme")])
        .unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|d| d.header_str("brand-id") == "acme"));

    let found = db
        .find_many(AssertionType::Repair, &[("repair-id", "1")])
        .unwrap();
    assert_eq!(found.len(), 2);

    let found = db
        .find_many(AssertionType::Account, &[("validation", "verified")])
        .unwrap();
    let ids: Vec<_> = found.iter().map(|d| d.header_str("account-id")).collect();
    assert!(ids.contains(&"canonical"));
    assert!(ids.contains(&"acme"));
    assert!(ids.contains(&"globex"));

    let err = db
        .find_many(AssertionType::Repair, &[("brand-id", "initech")])
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn revisions_only_move_forward() {
    let fixture = TrustFixture::new();
    let (db, brand) = with_brand(&fixture, "acme", 1);

    db.add(&brand.repair("1", 1)).unwrap();

    let err = db.add(&brand.repair("1", 1)).unwrap_err();
    assert_eq!(err.to_string(), "revision 1 is already the current revision");

    let err = db.add(&brand.repair("1", 0)).unwrap_err();
    assert_eq!(err.to_string(), "revision 0 is older than current revision 1");

    db.add(&brand.repair("1", 3)).unwrap();
    assert_eq!(
        db.find(AssertionType::Repair, &["acme", "1"]).unwrap().revision(),
        3
    );
}

#[test]
fn trusted_primary_keys_cannot_be_shadowed() {
    let fixture = TrustFixture::new();
    let db = fixture.database();

    let err = db.add(&fixture.root_account).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"cannot add "account" assertion with primary key clashing with a trusted assertion: ["canonical"]"#
    );
}

#[test]
fn unknown_signer_is_refused() {
    let fixture = TrustFixture::new();
    let db = fixture.database();
    let brand = fixture.brand("acme", 1);

    let err = db.add(&brand.repair("1", 0)).unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::Verify(VerifyError::UnresolvedKey { .. })
    ));
    assert_eq!(
        err.to_string(),
        format!(
            "no matching public key {:?} for signature by \"acme\"",
            brand.key.public_key().id()
        )
    );
}

#[test]
fn expired_signing_key_is_refused() {
    let fixture = TrustFixture::new();
    let brand = fixture.brand_with_validity(
        "acme",
        1,
        "2016-01-01T00:00:00Z",
        Some("2017-01-01T00:00:00Z"),
    );
    let db = fixture.database();
    for doc in brand.chain() {
        db.add(&doc).unwrap();
    }

    let err = db.add(&brand.repair("1", 0)).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "assertion is signed with expired public key {:?} from \"acme\"",
            brand.key.public_key().id()
        )
    );
    assert!(db.check(&brand.repair("1", 0)).is_err());
}

#[test]
fn accounts_need_a_trusted_signer() {
    let fixture = TrustFixture::new();
    let (db, brand) = with_brand(&fixture, "acme", 1);

    let account = brand.sign(
        AssertionType::Account,
        headers(&[
            ("account-id", "dev1"),
            ("display-name", "Developer"),
            ("validation", "unproven"),
            ("timestamp", TIMESTAMP),
        ]),
        b"",
    );
    let err = db.add(&account).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"account assertion "dev1" is not signed by a directly trusted authority: "acme""#
    );
}

#[test]
fn account_keys_need_their_account() {
    let fixture = TrustFixture::new();
    let db = fixture.database();

    let key = fixture.account_key("nobody", &device_key(9), "2016-01-01T00:00:00Z", None);
    let err = db.add(&key).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"account-key assertion for "nobody" does not have a matching account assertion"#
    );
}

#[test]
fn serials_from_other_brands_need_trust() {
    let fixture = TrustFixture::new();
    let (db, brand) = with_brand(&fixture, "acme", 1);
    let device = device_key(0x50);

    db.add(&brand.serial("frobinator", "S-1", &device)).unwrap();

    let foreign = brand.sign(
        AssertionType::Serial,
        serial_headers("globex", "frobinator", "S-1", &device),
        b"",
    );
    let err = db.add(&foreign).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"serial with authority "acme" different from brand "globex" must be signed by a trusted authority"#
    );

    let by_root = fixture.sign(
        AssertionType::Serial,
        serial_headers("globex", "frobinator", "S-1", &device),
        b"",
    );
    db.add(&by_root).unwrap();
}

#[test]
fn snap_declarations_and_revisions() {
    let fixture = TrustFixture::new();
    let (db, brand) = with_brand(&fixture, "acme", 1);
    let digest = Sha3_384Digest::hash(b"snap blob").to_base64url();

    let err = db
        .add(&fixture.snap_revision(&digest, "snap-id-1", "acme"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"snap-revision assertion for snap id "snap-id-1" does not have a matching snap-declaration assertion"#
    );

    let err = db
        .add(&fixture.snap_declaration("snap-id-1", "frob", "nobody"))
        .unwrap_err();
    assert!(err.to_string().contains("publisher \"nobody\""), "{err}");

    db.add(&fixture.snap_declaration("snap-id-1", "frob", "acme"))
        .unwrap();
    db.add(&fixture.snap_revision(&digest, "snap-id-1", "acme"))
        .unwrap();

    let decl = brand.sign(
        AssertionType::SnapDeclaration,
        headers(&[
            ("series", "16"),
            ("snap-id", "snap-id-2"),
            ("snap-name", "other"),
            ("publisher-id", "acme"),
            ("timestamp", TIMESTAMP),
        ]),
        b"",
    );
    let err = db.add(&decl).unwrap_err();
    assert!(
        err.to_string()
            .ends_with(r#"is not signed by a directly trusted authority: "acme""#),
        "{err}"
    );
}

#[test]
fn sign_with_managed_keys() {
    let fixture = TrustFixture::new();
    let (db, brand) = with_brand(&fixture, "acme", 1);
    let key_id = brand.key.public_key().id();

    let repair_headers = || {
        headers(&[
            ("authority-id", "acme"),
            ("brand-id", "acme"),
            ("repair-id", "7"),
            ("summary", "signed by the database"),
            ("timestamp", TIMESTAMP),
        ])
    };

    let err = db
        .sign(AssertionType::Repair, repair_headers(), b"", &key_id)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(r#"cannot sign assertion with unknown key {key_id:?} for authority "acme""#)
    );

    db.import_key("acme", &brand.key).unwrap();
    let doc = db
        .sign(AssertionType::Repair, repair_headers(), b"echo\n", &key_id)
        .unwrap();
    db.add(&doc).unwrap();

    let mut foreign = repair_headers();
    foreign.insert("authority-id", "globex");
    foreign.insert("brand-id", "globex");
    assert!(matches!(
        db.sign(AssertionType::Repair, foreign, b"", &key_id),
        Err(DatabaseError::UnknownSigningKey { .. })
    ));

    let fingerprint = db.generate_key("acme").unwrap();
    let keys = db.public_keys("acme").unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().any(|k| k.fingerprint() == fingerprint));
}

#[test]
fn only_accounts_can_be_trusted() {
    let fixture = TrustFixture::new();
    let brand = fixture.brand("acme", 1);
    let result = Database::open(asserts::DatabaseConfig {
        trusted: vec![brand.repair("1", 0)],
        ..Default::default()
    });
    assert!(matches!(result, Err(DatabaseError::UntrustableType("repair"))));
}
