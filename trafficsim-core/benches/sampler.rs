use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::{sync::Arc, time::Duration};
use trafficsim_core::{DepthGauge, EventCounters, IntervalSampler, NodeId, Statistics};

const RATE: f64 = 100.0;

fn sampler(c: &mut Criterion) {
    let mut sampler = IntervalSampler::for_source(RATE, NodeId::ZERO, 0).unwrap();

    c.bench_function("sample", |b| b.iter(|| sampler.next()));
    c.bench_function("sample_interval", |b| {
        b.iter(|| sampler.next_interval(black_box(Duration::from_secs(1))))
    });
}

fn counters(c: &mut Criterion) {
    let counters = Arc::new(EventCounters::new(89));
    let gauge = DepthGauge::with_capacity(50);
    gauge.reserve(17);

    c.bench_function("record_queue_sample", |b| {
        b.iter(|| counters.record_queue_sample(black_box(NodeId::new(42)), gauge.used_capacity()))
    });

    let snapshot = counters.snapshot();
    c.bench_function("aggregate", |b| {
        b.iter(|| Statistics::aggregate(black_box(&snapshot)))
    });
}

criterion_group!(benches, sampler, counters);
criterion_main!(benches);
