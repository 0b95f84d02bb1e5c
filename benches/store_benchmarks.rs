// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the sessionkv session store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::Runtime;

use sessionkv_storage::InMemoryBackend;
use sessionkv_store::{
    CipherAlgorithm, CryptoBox, KvSessionStore, PayloadCodec, SecretString, SessionRecord,
    SessionStore, StoreConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();
}

fn sample_session(fields: usize) -> SessionRecord {
    let mut record = SessionRecord::new().with_max_age(3_600_000);
    for i in 0..fields {
        record.insert(format!("field_{}", i), json!({ "n": i, "label": "benchmark value" }));
    }
    record
}

fn configs() -> Vec<(&'static str, StoreConfig)> {
    vec![
        ("plain", StoreConfig::new()),
        ("aes-256-gcm", StoreConfig::new().with_secret("bench secret")),
        (
            "aes-256-ecb",
            StoreConfig::new()
                .with_secret("bench secret")
                .with_algorithm("aes-256-ecb"),
        ),
    ]
}

// ============================================================================
// Store Benchmarks
// ============================================================================

fn bench_commit(c: &mut Criterion) {
    init_tracing();
    let rt = Runtime::new().unwrap();
    let session = sample_session(16);

    let mut group = c.benchmark_group("store");
    for (name, config) in configs() {
        let store = KvSessionStore::new(InMemoryBackend::new(), config).unwrap();
        group.bench_with_input(BenchmarkId::new("commit", name), &session, |b, session| {
            b.to_async(&rt).iter(|| async {
                black_box(store.commit("bench-sid", session).await.unwrap())
            });
        });
    }
    group.finish();
}

fn bench_fetch(c: &mut Criterion) {
    init_tracing();
    let rt = Runtime::new().unwrap();
    let session = sample_session(16);

    let mut group = c.benchmark_group("store");
    for (name, config) in configs() {
        let store = KvSessionStore::new(InMemoryBackend::new(), config).unwrap();
        rt.block_on(async { store.commit("bench-sid", &session).await.unwrap() });

        group.bench_function(BenchmarkId::new("fetch", name), |b| {
            b.to_async(&rt)
                .iter(|| async { black_box(store.fetch("bench-sid").await.unwrap()) });
        });
    }
    group.finish();
}

fn bench_concurrent_commits(c: &mut Criterion) {
    init_tracing();
    let rt = Runtime::new().unwrap();
    let store = KvSessionStore::new(
        InMemoryBackend::new(),
        StoreConfig::new().with_secret("bench secret"),
    )
    .unwrap();
    let ids: Vec<String> = (0..100).map(|_| uuid::Uuid::new_v4().to_string()).collect();
    let session = sample_session(4);

    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(ids.len() as u64));
    group.bench_function("concurrent_commit_100", |b| {
        b.to_async(&rt).iter(|| async {
            let commits = ids.iter().map(|id| store.commit(id, &session));
            black_box(futures::future::join_all(commits).await)
        });
    });
    group.finish();
}

// ============================================================================
// Codec and Crypto Benchmarks
// ============================================================================

fn bench_payload_codec(c: &mut Criterion) {
    let codec = PayloadCodec;
    let mut group = c.benchmark_group("codec");

    for fields in [1usize, 16, 128] {
        let session = sample_session(fields);
        let text = codec.encode(&session).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", fields), &session, |b, session| {
            b.iter(|| black_box(codec.encode(session).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", fields), &text, |b, text| {
            b.iter(|| black_box(codec.decode(text).unwrap()));
        });
    }
    group.finish();
}

fn bench_crypto(c: &mut Criterion) {
    let payload = PayloadCodec.encode(&sample_session(16)).unwrap();
    let mut group = c.benchmark_group("crypto");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for algorithm in [CipherAlgorithm::Aes256Gcm, CipherAlgorithm::LegacyAes256Ecb] {
        let crypto = CryptoBox::new(SecretString::from("bench secret"), algorithm);
        let envelope = crypto.seal(&payload).unwrap();

        group.bench_function(BenchmarkId::new("seal", algorithm), |b| {
            b.iter(|| black_box(crypto.seal(&payload).unwrap()));
        });
        group.bench_function(BenchmarkId::new("open", algorithm), |b| {
            b.iter(|| black_box(crypto.open(&envelope).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_commit,
    bench_fetch,
    bench_concurrent_commits,
    bench_payload_codec,
    bench_crypto,
);
criterion_main!(benches);
