use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use trafficsim_core::{IntervalSampler, NodeId, Scheduler, SendDue, SimTime};

const SOURCES: u32 = 89;

fn populated() -> Scheduler<SendDue> {
    let mut scheduler = Scheduler::new();
    for i in 0..SOURCES {
        let source = NodeId::new(i);
        scheduler.schedule_in(Duration::from_micros(u64::from(i)), SendDue { source });
    }
    scheduler
}

fn scheduler(c: &mut Criterion) {
    c.bench_function("schedule_and_pop", |b| {
        b.iter_batched(
            populated,
            |mut scheduler| {
                while let Some((_, due)) = scheduler.pop_until(SimTime::MAX) {
                    black_box(due);
                }
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("schedule_and_cancel", |b| {
        b.iter_batched(
            populated,
            |mut scheduler| {
                let id = scheduler.schedule_in(Duration::from_millis(1), SendDue {
                    source: NodeId::ZERO,
                });
                scheduler.cancel(black_box(id))
            },
            BatchSize::SmallInput,
        )
    });
}

/// one second of traffic of every source at 100 packets per second
fn timeline(c: &mut Criterion) {
    c.bench_function("timeline_1s", |b| {
        b.iter_batched(
            || {
                let samplers: Vec<_> = (0..SOURCES)
                    .map(|i| IntervalSampler::for_source(100.0, NodeId::new(i), 0).unwrap())
                    .collect();
                (populated(), samplers)
            },
            |(mut scheduler, mut samplers)| {
                let horizon = SimTime::from_secs(1);
                while let Some((_, SendDue { source })) = scheduler.pop_until(horizon) {
                    let delay = samplers[source.index()].next_interval(Duration::from_secs(1));
                    scheduler.schedule_in(delay, SendDue { source });
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, scheduler, timeline);
criterion_main!(benches);
