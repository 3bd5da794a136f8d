//! Benchmarks for assertion encoding, decoding, signing and verification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use asserts_core::{decode, verify, AssertionType, KeySet};
use asserts_testkit::fixtures::{headers, TrustFixture, TIMESTAMP};

fn bench_decode(c: &mut Criterion) {
    let fixture = TrustFixture::new();
    let mut group = c.benchmark_group("decode");

    for size in [0usize, 1024, 64 * 1024] {
        let brand = fixture.brand("acme", 1);
        let body = vec![b'x'; size];
        let doc = brand.sign(
            AssertionType::Repair,
            headers(&[
                ("brand-id", "acme"),
                ("repair-id", "1"),
                ("summary", "fix the frobinator"),
                ("timestamp", TIMESTAMP),
            ]),
            &body,
        );
        let encoded = doc.encode();

        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| black_box(decode(black_box(encoded)).unwrap()))
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let fixture = TrustFixture::new();
    let doc = fixture.brand("acme", 1).model("frobinator", TIMESTAMP);

    c.bench_function("encode_model", |b| b.iter(|| black_box(doc.encode())));
}

fn bench_sign(c: &mut Criterion) {
    let fixture = TrustFixture::new();
    let brand = fixture.brand("acme", 1);

    c.bench_function("sign_repair", |b| {
        b.iter(|| black_box(brand.repair("1", 0)))
    });
}

fn bench_verify(c: &mut Criterion) {
    let fixture = TrustFixture::new();
    let brand = fixture.brand("acme", 1);
    let mut keys = KeySet::new();
    keys.add_trusted(fixture.root_account_key.clone().into_account_key().unwrap());
    keys.add(brand.account_key.clone().into_account_key().unwrap());
    let doc = brand.repair("1", 0);

    c.bench_function("verify_delegated", |b| {
        b.iter(|| black_box(verify(black_box(&doc), &keys).unwrap()))
    });
}

criterion_group!(benches, bench_decode, bench_encode, bench_sign, bench_verify);
criterion_main!(benches);
