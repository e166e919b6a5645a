use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use npc_arena::metrics::MetricsCollector;
use npc_arena::prelude::*;
use npc_arena::workers::MovementWorker;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

fn worker(population: usize, bounds: Bounds) -> (MovementWorker, Arc<BattleQueue>) {
    let mut rng = StdRng::seed_from_u64(0xA2E4A);
    let roster = Roster::seeded(population, bounds, &mut rng).unwrap();
    roster.seal();
    let battles = Arc::new(WorkQueue::new("battles"));
    let worker = MovementWorker::new(
        Arc::new(roster),
        Arc::new(RuleTable::standard()),
        battles.clone(),
        MetricsCollector::new(),
        0..=0,
        StdRng::seed_from_u64(7),
    );
    (worker, battles)
}

fn bench_movement_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement_tick");

    for (population, side) in [(100_usize, 100), (500, 100), (500, 400)] {
        group.bench_function(format!("agents{}_map{}", population, side), |b| {
            b.iter_batched(
                || worker(population, Bounds::new(side, side)),
                |(mut worker, battles)| {
                    let queued = worker.tick();
                    // keep the queue alive until the tick is measured
                    criterion::black_box((queued, battles.len()))
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_movement_tick);
criterion_main!(benches);
