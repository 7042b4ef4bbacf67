use std::collections::LinkedList;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use qsort_rs::{SortConfig, parallel_sort_with};
use rayon::prelude::*;

fn generate(n: usize, seed: u64) -> Vec<u64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        })
        .collect()
}

fn bench_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_random_u64");
    for n in [10_000usize, 100_000, 1_000_000] {
        let data = generate(n, 0x9E37_79B9_7F4A_7C15);

        group.bench_with_input(BenchmarkId::new("parallel_list", n), &data, |b, data| {
            let config = SortConfig::default();
            b.iter(|| {
                let list: LinkedList<u64> = data.iter().copied().collect();
                black_box(parallel_sort_with(list, &config))
            })
        });

        group.bench_with_input(BenchmarkId::new("list_one_thread", n), &data, |b, data| {
            let config = SortConfig::with_max_workers(0);
            b.iter(|| {
                let list: LinkedList<u64> = data.iter().copied().collect();
                black_box(parallel_sort_with(list, &config))
            })
        });

        group.bench_with_input(BenchmarkId::new("slice_unstable", n), &data, |b, data| {
            b.iter(|| {
                let mut v = data.clone();
                v.sort_unstable();
                black_box(v)
            })
        });

        group.bench_with_input(BenchmarkId::new("rayon_unstable", n), &data, |b, data| {
            b.iter(|| {
                let mut v = data.clone();
                v.par_sort_unstable();
                black_box(v)
            })
        });
    }
    group.finish();
}

fn bench_worker_cap(c: &mut Criterion) {
    let data = generate(200_000, 42);
    let mut group = c.benchmark_group("sort_worker_cap");
    for cap in [0usize, 1, 3, 7] {
        group.bench_with_input(BenchmarkId::from_parameter(cap), &data, |b, data| {
            let config = SortConfig::with_max_workers(cap);
            b.iter(|| {
                let list: LinkedList<u64> = data.iter().copied().collect();
                black_box(parallel_sort_with(list, &config))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_random, bench_worker_cap);
criterion_main!(benches);
