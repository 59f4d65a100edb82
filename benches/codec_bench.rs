use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use index_compat::codec::{binary, json};
use index_compat::generator::{GeneratorConfig, IndexStateGenerator};

fn bench_codecs(c: &mut Criterion) {
    let config = GeneratorConfig {
        min_entries: 1_000,
        max_entries: 1_000,
    };
    let mut generator = IndexStateGenerator::new(config, Some(42)).unwrap();
    let st = generator.random_valid_index_state();

    let bytes = binary::to_bytes(&st).unwrap();
    let text = json::to_text(&st).unwrap();

    let mut group = c.benchmark_group("index_state_codecs");

    group.bench_function("binary_encode", |b| {
        b.iter(|| black_box(binary::to_bytes(black_box(&st)).unwrap()))
    });
    group.bench_function("binary_decode", |b| {
        b.iter(|| black_box(binary::from_bytes(black_box(&bytes)).unwrap()))
    });
    group.bench_function("text_encode", |b| {
        b.iter(|| black_box(json::to_text(black_box(&st)).unwrap()))
    });
    group.bench_function("text_decode", |b| {
        b.iter(|| black_box(json::from_text(black_box(&text)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_codecs);
criterion_main!(benches);
