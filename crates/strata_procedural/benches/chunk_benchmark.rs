//! Benchmark for chunk generation and streaming.
//!
//! Streaming cost must depend on view distance only, not on how much of
//! the world has been generated.
//!
//! Run with: cargo bench --package strata_procedural --bench chunk_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use strata_core::Registry;
use strata_procedural::{ChunkCoord, TileIndex, WorldManager, WorldManagerConfig};

fn fresh_world(view_distance: u32) -> (Registry, WorldManager) {
    let mut registry = Registry::new(2_000_000).expect("registry");
    let config = WorldManagerConfig {
        view_distance,
        ..WorldManagerConfig::default()
    };
    let world = WorldManager::new(config, &mut registry).expect("world");
    (registry, world)
}

fn benchmark_generate_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_generation");
    group.sample_size(10);
    group.throughput(Throughput::Elements(25));

    group.bench_function("5x5_block_fresh_world", |b| {
        b.iter_batched(
            || fresh_world(2),
            |(mut registry, mut world)| {
                black_box(
                    world
                        .stream_around(&mut registry, &[ChunkCoord::new(0, 0)])
                        .expect("stream"),
                )
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn benchmark_walk_one_chunk(c: &mut Criterion) {
    let (mut registry, mut world) = fresh_world(3);
    let mut x = 0i32;
    world
        .stream_around(&mut registry, &[ChunkCoord::new(x, 0)])
        .expect("stream");

    c.bench_function("walk_one_chunk_view_3", |b| {
        b.iter(|| {
            // Oscillate so the cache, not the generator, is measured.
            x = if x == 0 { 1 } else { 0 };
            black_box(
                world
                    .stream_around(&mut registry, &[ChunkCoord::new(x, 0)])
                    .expect("stream"),
            )
        });
    });
}

fn benchmark_idle_update(c: &mut Criterion) {
    let (mut registry, mut world) = fresh_world(3);
    world
        .stream_around(&mut registry, &[ChunkCoord::new(0, 0)])
        .expect("stream");

    c.bench_function("idle_update_view_3", |b| {
        b.iter(|| {
            black_box(
                world
                    .stream_around(&mut registry, &[ChunkCoord::new(0, 0)])
                    .expect("stream"),
            )
        });
    });
}

fn benchmark_can_place(c: &mut Criterion) {
    let (mut registry, mut world) = fresh_world(1);
    world
        .stream_around(&mut registry, &[ChunkCoord::new(0, 0)])
        .expect("stream");

    c.bench_function("can_place_3x3", |b| {
        let mut i = 0i32;
        b.iter(|| {
            i = (i + 1) % 60;
            black_box(world.can_place_building(TileIndex::new(i - 30, i - 30), 3, 3))
        });
    });
}

criterion_group!(
    benches,
    benchmark_generate_block,
    benchmark_walk_one_chunk,
    benchmark_idle_update,
    benchmark_can_place
);
criterion_main!(benches);
