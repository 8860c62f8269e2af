//! Allocation benchmarks for the ring.
//!
//! Benchmarks for:
//! - The alloc/release cycle at several slot sizes
//! - Allocation against a contending releaser thread
//! - The async fast path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ringcache_async::AsyncRing;
use ringcache_bench::BENCH_CAPACITY;
use ringcache_core::RingBuffer;

/// Benchmark the uncontended alloc/release cycle.
fn bench_alloc_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring/alloc_release");

    for size in [16usize, 256, 1024].iter() {
        let ring = RingBuffer::new(BENCH_CAPACITY);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let slot = ring.try_alloc(size);
                black_box(&slot);
            });
        });
    }

    group.finish();
}

/// Benchmark allocation while another thread releases the slots.
///
/// One producer allocates, one consumer drops; the contention is on the
/// free cursor between the release CAS and the producer's sweep.
fn bench_alloc_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring/alloc_contended");
    group.throughput(Throughput::Elements(1));

    group.bench_function("16B", |b| {
        let ring = RingBuffer::new(BENCH_CAPACITY);
        let (tx, rx) = std::sync::mpsc::channel();

        let releaser = std::thread::spawn(move || {
            for slot in rx {
                black_box(&slot);
                drop(slot);
            }
        });

        b.iter(|| {
            if let Some(slot) = ring.try_alloc(16) {
                let _ = tx.send(slot);
            }
        });

        drop(tx);
        releaser.join().expect("releaser thread panicked");
    });

    group.finish();
}

/// Benchmark mixed-size churn that keeps the ring near-full.
fn bench_mixed_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring/mixed_churn");
    group.throughput(Throughput::Elements(1));

    group.bench_function("1-512B", |b| {
        let ring = RingBuffer::new(BENCH_CAPACITY);
        let mut rng = StdRng::seed_from_u64(42);
        let mut live = Vec::with_capacity(128);

        b.iter(|| {
            let len = rng.gen_range(1..=512);
            match ring.try_alloc(len) {
                Some(slot) => live.push(slot),
                None => live.clear(),
            }
            black_box(live.len());
        });
    });

    group.finish();
}

/// Benchmark the async fast path (empty queue, space available).
fn bench_async_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_ring/fast_path");
    group.throughput(Throughput::Elements(1));

    group.bench_function("16B", |b| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("failed to build runtime");
        let ring = AsyncRing::new(BENCH_CAPACITY);

        b.iter(|| {
            let slot = runtime.block_on(ring.alloc(16));
            black_box(&slot);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_alloc_release,
    bench_alloc_contended,
    bench_mixed_churn,
    bench_async_fast_path
);
criterion_main!(benches);
