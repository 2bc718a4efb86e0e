use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use ivstore::{FlatNestStore, IntervalStore, NcListStore};
use ivstore_core::Span;

const STORE_SIZE: usize = 1_000_000;
const SEQUENCE_WIDTH: i32 = 10_000_000;
const MAX_LENGTH: i32 = 50;
const WINDOW: i32 = 1_000;

fn random_spans(rng: &mut StdRng, n: usize) -> Vec<Span> {
    (0..n)
        .map(|_| {
            let begin = rng.gen_range(0..SEQUENCE_WIDTH);
            Span::new(begin, begin + rng.gen_range(0..MAX_LENGTH))
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);
    for size in [100_000, STORE_SIZE] {
        let mut rng = StdRng::seed_from_u64(42);
        let seed = random_spans(&mut rng, size);
        group.bench_with_input(BenchmarkId::new("nclist", size), &seed, |b, seed| {
            b.iter(|| NcListStore::build(black_box(seed.clone())))
        });
        group.bench_with_input(BenchmarkId::new("flat", size), &seed, |b, seed| {
            b.iter(|| FlatNestStore::build(black_box(seed.clone())))
        });
    }
    group.finish();
}

fn bench_windowed_queries(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let seed = random_spans(&mut rng, STORE_SIZE);
    let mut nclist = NcListStore::build(seed.clone());
    let mut flat = FlatNestStore::build(seed);
    // finalise outside the timed loop
    nclist.revalidate();
    flat.revalidate();

    let windows: Vec<i32> = (0..1_000)
        .map(|_| rng.gen_range(0..SEQUENCE_WIDTH - WINDOW))
        .collect();

    let mut group = c.benchmark_group("find_overlaps");
    group.bench_function("nclist", |b| {
        let mut i = 0;
        b.iter(|| {
            let from = windows[i % windows.len()];
            i += 1;
            black_box(nclist.find_overlaps(from, from + WINDOW))
        })
    });
    group.bench_function("flat", |b| {
        let mut i = 0;
        b.iter(|| {
            let from = windows[i % windows.len()];
            i += 1;
            black_box(flat.find_overlaps(from, from + WINDOW))
        })
    });
    group.finish();
}

fn bench_incremental_add(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let seed = random_spans(&mut rng, 100_000);
    let extra = random_spans(&mut rng, 1_000);

    let mut group = c.benchmark_group("add_after_build");
    group.bench_function("flat_buffered", |b| {
        b.iter_batched(
            || FlatNestStore::build(seed.clone()),
            |mut store| {
                for iv in &extra {
                    store.add(*iv);
                }
                black_box(store.find_overlaps(0, WINDOW))
            },
            criterion::BatchSize::LargeInput,
        )
    });
    group.bench_function("nclist", |b| {
        b.iter_batched(
            || NcListStore::build(seed.clone()),
            |mut store| {
                for iv in &extra {
                    store.add(*iv);
                }
                black_box(store.find_overlaps(0, WINDOW))
            },
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_windowed_queries,
    bench_incremental_add
);
criterion_main!(benches);
