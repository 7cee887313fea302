//! Benchmarks for the scheduler's hot paths.
//!
//! Benchmarks cover:
//! - Queue operations (enqueue/pop, mixed priorities, removal)
//! - Admission window checks
//! - End-to-end submit-to-completion through the scheduler

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use prometheus_scheduler::builders::SchedulerBuilder;
use prometheus_scheduler::config::SchedulerConfig;
use prometheus_scheduler::core::{
    AdmissionController, AdmissionWindow, Priority, Recurrence, ScheduledTask, TaskDescriptor,
    TaskMetadata, TaskOutput, TaskQueue,
};
use prometheus_scheduler::infra::queue::InMemoryQueue;
use prometheus_scheduler::runtime::TokioSpawner;
use tokio::runtime::Runtime;
use tokio::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

fn build_task(id: u64, priority: i32, due_at: Instant) -> ScheduledTask {
    ScheduledTask {
        meta: TaskMetadata {
            id,
            name: None,
            priority: Priority(priority),
            due_at,
            recurrence: Recurrence::None,
            resource: None,
        },
        payload: TaskDescriptor::from_fn(|_ctx| async { Ok(TaskOutput::Null) }).payload,
    }
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_enqueue_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_enqueue_pop");

    for size in [100_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let now = Instant::now();
            b.iter(|| {
                let mut queue = InMemoryQueue::new(size as usize);
                for id in 0..size {
                    queue.enqueue(build_task(id, 0, now)).unwrap();
                }
                while let Some(task) = queue.pop(now) {
                    black_box(task);
                }
            });
        });
    }
    group.finish();
}

fn bench_queue_mixed_priorities(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_mixed_priorities");

    for size in [1_000_u64, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let base = Instant::now();
            let far = base + Duration::from_secs(3600);
            b.iter(|| {
                let mut queue = InMemoryQueue::new(size as usize);
                for id in 0..size {
                    let due = base + Duration::from_millis(id % 97);
                    let priority = (id % 7) as i32 - 3;
                    queue.enqueue(build_task(id, priority, due)).unwrap();
                }
                while let Some(task) = queue.pop(far) {
                    black_box(task);
                }
            });
        });
    }
    group.finish();
}

fn bench_queue_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_remove");

    for size in [1_000_u64, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let now = Instant::now();
            b.iter(|| {
                let mut queue = InMemoryQueue::new(size as usize);
                for id in 0..size {
                    queue.enqueue(build_task(id, 0, now)).unwrap();
                }
                for id in (0..size).step_by(2) {
                    black_box(queue.remove(id));
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Admission Benchmarks
// ============================================================================

fn bench_admission_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_window");

    for limit in [10_usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(limit), &limit, |b, &limit| {
            let base = Instant::now();
            b.iter(|| {
                let mut window = AdmissionWindow::new(limit, Duration::from_millis(100));
                // Ten windows' worth of attempts, one per millisecond.
                for ms in 0..1_000_u64 {
                    black_box(window.try_admit(base + Duration::from_millis(ms)));
                }
            });
        });
    }
    group.finish();
}

fn bench_admission_controller(c: &mut Criterion) {
    let controller = AdmissionController::new();
    for i in 0..16 {
        controller
            .configure(&format!("resource-{i}"), 1_000, Duration::from_secs(1))
            .unwrap();
    }

    c.bench_function("admission_controller_try_admit", |b| {
        let mut i = 0_u64;
        b.iter(|| {
            i += 1;
            let name = format!("resource-{}", i % 16);
            black_box(controller.try_admit(&name, Instant::now()))
        });
    });
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_scheduler_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("scheduler_throughput");
    group.sample_size(10);

    for task_count in [100_u64, 1_000] {
        group.throughput(Throughput::Elements(task_count));
        group.bench_with_input(
            BenchmarkId::from_parameter(task_count),
            &task_count,
            |b, &task_count| {
                b.to_async(&rt).iter(|| async move {
                    let config = SchedulerConfig {
                        worker_count: 4,
                        poll_interval_ms: 5,
                        ..SchedulerConfig::default()
                    };
                    let scheduler = SchedulerBuilder::new(config)
                        .build(TokioSpawner::current().unwrap())
                        .unwrap();
                    let mut events = scheduler.subscribe();
                    scheduler.start().unwrap();

                    for i in 0..task_count {
                        scheduler
                            .submit(
                                TaskDescriptor::from_fn(|ctx| async move {
                                    Ok(TaskOutput::from(ctx.task_id))
                                })
                                .with_priority((i % 5) as i32),
                            )
                            .unwrap();
                    }
                    for _ in 0..task_count {
                        black_box(events.recv().await);
                    }
                    scheduler.shutdown().await;
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    queue_benches,
    bench_queue_enqueue_pop,
    bench_queue_mixed_priorities,
    bench_queue_remove
);
criterion_group!(
    admission_benches,
    bench_admission_window,
    bench_admission_controller
);
criterion_group!(scheduler_benches, bench_scheduler_throughput);
criterion_main!(queue_benches, admission_benches, scheduler_benches);
