//! Benchmark for noise sampling and terrain classification.
//!
//! TARGET: 1,000,000 raw samples per second
//!
//! Run with: cargo bench --package strata_procedural --bench noise_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_procedural::noise::{FractalNoise, NoiseField, SimplexNoise, WorldSeed};
use strata_procedural::{TerrainClassifier, TileIndex, WorldManagerConfig};

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    c.bench_function("single_noise_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_million_samples(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    let mut group = c.benchmark_group("million_samples");
    group.throughput(Throughput::Elements(1_000_000));
    group.sample_size(10);

    group.bench_function("1M_noise_samples", |b| {
        b.iter(|| {
            for i in 0..1_000_000u32 {
                let x = f64::from(i % 1000) * 0.1;
                let y = f64::from(i / 1000) * 0.1;
                black_box(noise.sample(x, y));
            }
        });
    });

    group.finish();
}

fn benchmark_fractal_field(c: &mut Criterion) {
    let field = FractalNoise::new(WorldSeed::new(42), 0.04, 4);

    c.bench_function("fractal_field_4_octaves", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 1.0;
            black_box(field.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_classify_tile(c: &mut Criterion) {
    let classifier = TerrainClassifier::from_config(&WorldManagerConfig::default());

    c.bench_function("classify_tile", |b| {
        let mut x = 0i32;
        b.iter(|| {
            x = x.wrapping_add(1);
            black_box(classifier.classify(black_box(TileIndex::new(x, x / 3))))
        });
    });
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_million_samples,
    benchmark_fractal_field,
    benchmark_classify_tile
);
criterion_main!(benches);
