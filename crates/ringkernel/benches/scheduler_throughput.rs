//! Scheduler throughput: spawn-and-yield chains of a fixed depth.

use criterion::{criterion_group, criterion_main, Criterion};
use ringkernel::{Scheduler, YieldPoint};

fn bench_yield_chain(c: &mut Criterion) {
    c.bench_function("scheduler_throughput/yield_chain_100", |b| {
        b.iter(|| {
            let scheduler = Scheduler::new(8).unwrap();
            scheduler.spawn(async {
                for _ in 0..100 {
                    YieldPoint::new().await;
                }
                Scheduler::current().unwrap().stop();
            });
            scheduler.run();
        });
    });
}

fn bench_spawn_and_complete(c: &mut Criterion) {
    c.bench_function("scheduler_throughput/spawn_and_complete_1000", |b| {
        b.iter(|| {
            let scheduler = Scheduler::new(1024).unwrap();
            for _ in 0..999 {
                scheduler.spawn(async {});
            }
            scheduler.spawn(async {
                Scheduler::current().unwrap().stop();
            });
            scheduler.run();
        });
    });
}

criterion_group!(benches, bench_yield_chain, bench_spawn_and_complete);
criterion_main!(benches);
