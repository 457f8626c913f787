//! Canonical JSON hashing benchmarks

use butterknife::store::canonical::{canonical_json, hash_value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn bench_canonical_json(c: &mut Criterion) {
    let small = json!({"model": "m", "messages": [{"role": "user", "content": "hello"}]});
    let nested = json!({
        "z": {"nested": {"deep": [1, 2, 3, {"k": "v"}]}},
        "a": [true, false, null],
        "m": {"b": 1, "a": 2, "c": {"y": "x"}}
    });

    c.bench_function("canonical_json_small", |b| {
        b.iter(|| canonical_json(black_box(&small)))
    });

    c.bench_function("canonical_json_nested", |b| {
        b.iter(|| canonical_json(black_box(&nested)))
    });

    c.bench_function("hash_value_small", |b| {
        b.iter(|| hash_value(black_box(Some(&small))))
    });
}

criterion_group!(benches, bench_canonical_json);
criterion_main!(benches);
