//! Sketch Store Benchmarks
//!
//! Benchmarks for the probabilistic structures and the store façade, using
//! the Criterion framework for statistical analysis and regression detection.
//!
//! To run the benchmarks:
//! ```bash
//! cargo bench --features benchmarking
//! ```

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput,
};
use std::time::Duration;

use sketch_store_lib::data_structures::bloom::{BloomFilterConfig, ScalableBloomFilter};
use sketch_store_lib::data_structures::{CountMinSketch, HyperLogLog, TopK};
use sketch_store_lib::store::SketchStore;

fn words(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("word-{i}")).collect()
}

/// Benchmark the scalable Bloom filter
fn bench_bloom(c: &mut Criterion) {
    let mut group = c.benchmark_group("bloom");
    group.sampling_mode(SamplingMode::Flat);
    group.measurement_time(Duration::from_secs(2));
    group.warm_up_time(Duration::from_secs(1));

    for size in [1_000usize, 10_000, 100_000] {
        let items = words(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("insert", size), &items, |b, items| {
            b.iter(|| {
                let filter = ScalableBloomFilter::with_config(
                    BloomFilterConfig::new().with_error_rate(0.01).with_capacity(1_000),
                )
                .unwrap();
                for item in items {
                    black_box(filter.insert(item.as_bytes()));
                }
            });
        });

        let filter = ScalableBloomFilter::with_config(
            BloomFilterConfig::new().with_error_rate(0.01).with_capacity(size as u64),
        )
        .unwrap();
        for item in &items {
            filter.insert(item.as_bytes());
        }
        group.bench_with_input(BenchmarkId::new("contains", size), &items, |b, items| {
            b.iter(|| {
                for item in items {
                    black_box(filter.contains(item.as_bytes()));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark HyperLogLog adds and estimates
fn bench_hyperloglog(c: &mut Criterion) {
    let mut group = c.benchmark_group("hyperloglog");
    let items = words(10_000);
    group.throughput(Throughput::Elements(items.len() as u64));

    for precision in [10u8, 14, 18] {
        group.bench_with_input(BenchmarkId::new("add", precision), &precision, |b, &precision| {
            let hll = HyperLogLog::new(precision).unwrap();
            b.iter(|| {
                for item in &items {
                    black_box(hll.add(item.as_bytes()));
                }
            });
        });

        let hll = HyperLogLog::new(precision).unwrap();
        items.iter().for_each(|item| {
            hll.add(item.as_bytes());
        });
        group.bench_with_input(BenchmarkId::new("count", precision), &hll, |b, hll| {
            b.iter(|| black_box(hll.count()));
        });
    }

    group.finish();
}

/// Benchmark Count-Min increments and Top-K adds on a skewed stream
fn bench_frequency(c: &mut Criterion) {
    let mut group = c.benchmark_group("frequency");
    let stream: Vec<String> = (0..10_000).map(|i| format!("word-{}", i % 97 * (i % 7))).collect();
    group.throughput(Throughput::Elements(stream.len() as u64));

    group.bench_function("count_min_increment", |b| {
        let sketch = CountMinSketch::with_error(0.001, 0.01).unwrap();
        b.iter(|| {
            for item in &stream {
                black_box(sketch.increment_by(item.as_bytes(), 1));
            }
        });
    });

    group.bench_function("top_k_add", |b| {
        let topk = TopK::new(10, 8, 7, 0.9).unwrap();
        b.iter(|| {
            for item in &stream {
                black_box(topk.add(item.as_bytes()));
            }
        });
    });

    group.finish();
}

/// Benchmark dispatch overhead of the store façade
fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let items = words(1_000);
    group.throughput(Throughput::Elements(items.len() as u64));

    group.bench_function("bf_add", |b| {
        let store = SketchStore::new();
        b.iter(|| {
            for item in &items {
                black_box(store.bf_add("bench", item.as_bytes()).unwrap());
            }
        });
    });

    group.bench_function("cms_incr_by", |b| {
        let store = SketchStore::new();
        store.cms_init_by_dim("bench", 2_000, 7, None).unwrap();
        b.iter(|| black_box(store.cms_incr_by("bench", items.iter().map(|item| (item, 1))).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bloom,
    bench_hyperloglog,
    bench_frequency,
    bench_store
);
criterion_main!(benches);
