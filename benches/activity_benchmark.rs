/*!
 * Activity Benchmarks
 *
 * Trigger-to-step wake latency and execution engine step cost
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rtgraph::{
    Activity, Component, ComponentRegistry, ComponentSpec, ExecutionEngine, Runnable, SchedulePolicy,
};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

struct Notify {
    tx: SyncSender<()>,
}

impl Runnable for Notify {
    fn init(&self) {}

    fn step(&self) {
        let _ = self.tx.send(());
    }

    fn finalize(&self) {}
}

#[derive(Default)]
struct Accumulator {
    sum: u64,
}

impl Component for Accumulator {
    fn on_update(&mut self) {
        self.sum = black_box(self.sum.wrapping_add(1));
    }
}

fn bench_trigger_latency(c: &mut Criterion) {
    let (tx, rx): (SyncSender<()>, Receiver<()>) = sync_channel(1);
    let activity = Activity::dedicated(SchedulePolicy::triggered());
    activity.add_runnable(Arc::new(Notify { tx }));
    activity.start().unwrap();

    c.bench_function("trigger_to_step", |b| {
        b.iter(|| {
            activity.trigger();
            rx.recv().unwrap();
        });
    });

    activity.stop();
    activity.join().unwrap();
}

fn bench_engine_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_step");

    for profiling in [false, true] {
        let registry = Arc::new(ComponentRegistry::new());
        registry.add_spec(ComponentSpec::of::<Accumulator>("Accumulator"));
        registry.enable_profiling(profiling);

        let task = registry.create("Accumulator", "acc").unwrap();
        let engine = ExecutionEngine::new(task, Arc::clone(&registry));
        engine.init();

        group.bench_with_input(
            BenchmarkId::new("profiling", profiling),
            &engine,
            |b, engine| {
                b.iter(|| engine.step());
            },
        );
    }

    let registry = Arc::new(ComponentRegistry::new());
    registry.add_spec(ComponentSpec::of::<Accumulator>("Accumulator"));
    let task = registry.create("Accumulator", "acc").unwrap();
    let engine = ExecutionEngine::new(Arc::clone(&task), registry);
    engine.init();

    group.bench_function("with_pending_ops", |b| {
        b.iter(|| {
            for _ in 0..4 {
                task.enqueue(|component| {
                    black_box(component.info());
                });
            }
            engine.step();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_trigger_latency, bench_engine_step);
criterion_main!(benches);
