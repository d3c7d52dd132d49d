//! Benchmarks for Memoir's statistical kernels
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use memoir::analytics::saga::SagaEngine;
use memoir::memory::MemoryRecord;
use memoir::stats;

fn series(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| ((i as f64 * 0.7).sin() + (i % 5) as f64 * 0.1))
        .collect()
}

fn embeddings(count: usize, dims: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..dims)
                .map(|d| ((i * 31 + d * 7) % 13) as f32 / 13.0)
                .collect()
        })
        .collect()
}

fn bench_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");

    for size in [100, 1000, 10000] {
        let x = series(size);
        let y: Vec<f64> = x.iter().map(|v| v * 0.8 + 0.1).collect();

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("pearson_{}", size), |b| {
            b.iter(|| stats::pearson(black_box(&x), black_box(&y)))
        });

        group.bench_function(format!("ema_{}", size), |b| {
            b.iter(|| stats::ema(black_box(&x), 0.3))
        });

        group.bench_function(format!("autocorrelation_{}", size), |b| {
            b.iter(|| stats::autocorrelation(black_box(&x), 7))
        });
    }

    group.finish();
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans");

    for count in [50, 200, 500] {
        let vectors = embeddings(count, 64);
        let points: Vec<&[f32]> = vectors.iter().map(|v| v.as_slice()).collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("cluster_{}", count), |b| {
            b.iter(|| SagaEngine::kmeans(black_box(&points), 8))
        });
    }

    group.finish();
}

fn bench_fabric(c: &mut Criterion) {
    use memoir::analytics::fabric::SimilarityGraph;

    let mut group = c.benchmark_group("fabric");

    for count in [50, 200] {
        let records: Vec<MemoryRecord> = embeddings(count, 32)
            .into_iter()
            .enumerate()
            .map(|(i, e)| MemoryRecord::new(format!("memory {}", i)).embedding(e))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("graph_{}", count), |b| {
            b.iter(|| SimilarityGraph::build(black_box(&records)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stats, bench_kmeans, bench_fabric);
criterion_main!(benches);
