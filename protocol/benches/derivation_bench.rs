// Identity derivation benchmarks.
//
// Covers meta generation, address derivation per scheme (cold and cached),
// identifier parsing (cold and cached), and document signing/verification.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use mkm_protocol::crypto::{EccPrivateKey, Ed25519PrivateKey, PrivateKey, VerifyKey};
use mkm_protocol::identity::{
    Address, AddressFactory, BaseAddressFactory, DocumentBuilder, DocumentType, EntityType,
    Identifier,
};
use mkm_protocol::{Extensions, PluginLoader};

fn loaded() -> Extensions {
    let mut ext = Extensions::new();
    PluginLoader::default().load(&mut ext);
    ext
}

fn bench_generate_meta(c: &mut Criterion) {
    let ext = loaded();
    let ecc = EccPrivateKey::generate();
    let ed = Ed25519PrivateKey::generate();

    c.bench_function("meta/generate_ecc_with_seed", |b| {
        b.iter(|| ext.generate_meta("1", &ecc, Some("moky")));
    });
    c.bench_function("meta/generate_ed25519_with_seed", |b| {
        b.iter(|| ext.generate_meta("1", &ed, Some("moky")));
    });
}

fn bench_address_derivation(c: &mut Criterion) {
    let ext = loaded();
    let key = EccPrivateKey::generate();
    let mut group = c.benchmark_group("address/derive_uncached");

    for meta_type in ["1", "2", "4"] {
        let Ok(meta) = ext.generate_meta(meta_type, &key, Some("moky")) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(meta_type), &meta, |b, meta| {
            let factory = BaseAddressFactory::new();
            b.iter(|| {
                factory.clear();
                factory.generate_address(meta, EntityType::USER)
            });
        });
    }
    group.finish();

    let meta = match ext.generate_meta("1", &key, Some("moky")) {
        Ok(meta) => meta,
        Err(_) => return,
    };
    c.bench_function("address/derive_cached", |b| {
        b.iter(|| ext.generate_address(&meta, EntityType::USER));
    });
}

fn bench_address_parse(c: &mut Criterion) {
    c.bench_function("address/parse_base58", |b| {
        b.iter(|| Address::parse("1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm"));
    });
    c.bench_function("address/parse_eth", |b| {
        b.iter(|| Address::parse("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
    });
}

fn bench_id_parse(c: &mut Criterion) {
    let ext = loaded();
    let text = "moky@4DnqXWdTV8wuZgfqSCX9GjE2kNq7HJrUgQ/desktop";

    c.bench_function("id/parse_uncached", |b| {
        b.iter(|| Identifier::parse(text));
    });
    c.bench_function("id/parse_cached", |b| {
        b.iter(|| ext.parse_id(text));
    });
}

fn bench_document(c: &mut Criterion) {
    let ext = loaded();
    let key = EccPrivateKey::generate();
    let public_key = key.public_key();
    let builder = DocumentBuilder::new(Identifier::founder(), DocumentType::Visa)
        .property("name", "Moky")
        .visa_key(public_key.to_map());

    c.bench_function("document/sign_visa", |b| {
        b.iter(|| builder.clone().sign(&key));
    });

    let Ok(doc) = builder.sign(&key) else {
        return;
    };
    let wire = doc.to_value();
    c.bench_function("document/parse_and_verify", |b| {
        b.iter(|| {
            ext.parse_document(&wire)
                .map(|doc| doc.verify(public_key.as_ref()))
        });
    });
}

criterion_group!(
    benches,
    bench_generate_meta,
    bench_address_derivation,
    bench_address_parse,
    bench_id_parse,
    bench_document,
);
criterion_main!(benches);
