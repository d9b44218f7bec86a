//! Benchmarks for conduit handoff and stage chains
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dataflow_rs::estimation::{Estimator, TwoMoments};
use dataflow_rs::pipeline::{conduit, filters, MapStage, Pipeline};
use std::thread;

fn bench_conduit_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("conduit_handoff");

    for count in [1_000u64, 10_000].iter() {
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::new("rendezvous", count), count, |b, &count| {
            b.iter(|| {
                let (mut tx, rx) = conduit::<f64>("bench");
                let producer = thread::spawn(move || {
                    for i in 0..count {
                        tx.send(i as f64).unwrap();
                    }
                    tx.close().unwrap();
                });
                let sum: f64 = rx.iter().sum();
                producer.join().unwrap();
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_map_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_chain");
    let count = 5_000u64;

    for depth in [1usize, 4].iter() {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("depth", depth), depth, |b, &depth| {
            b.iter(|| {
                let (mut head_tx, mut rx) = conduit::<f64>("head");
                let mut pipeline = Pipeline::new();
                for i in 0..depth {
                    let (tx, next_rx) = conduit(format!("m{}", i));
                    pipeline
                        .spawn(MapStage::new(filters::affine(1.0, 1.0), rx, tx))
                        .unwrap();
                    rx = next_rx;
                }
                let producer = thread::spawn(move || {
                    for i in 0..count {
                        head_tx.send(i as f64).unwrap();
                    }
                    head_tx.close().unwrap();
                });
                let last = rx.iter().last();
                producer.join().unwrap();
                black_box(pipeline.join());
                black_box(last)
            });
        });
    }

    group.finish();
}

fn bench_two_moments(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimator");
    let values: Vec<f64> = (0..10_000).map(|i| (i as f64).sin()).collect();

    group.throughput(Throughput::Elements(values.len() as u64));
    group.bench_function("two_moments_observe", |b| {
        b.iter(|| {
            let mut est = TwoMoments::default();
            for &x in &values {
                est.observe(black_box(x));
            }
            black_box(est.render())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_conduit_handoff,
    bench_map_chain,
    bench_two_moments
);
criterion_main!(benches);
