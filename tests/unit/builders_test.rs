//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use prometheus_scheduler::builders::{build_scheduler, SchedulerBuilder};
use prometheus_scheduler::config::SchedulerConfig;
use prometheus_scheduler::core::{SchedulerError, SchedulerState, TaskEvent};
use prometheus_scheduler::infra::InMemoryQueue;
use prometheus_scheduler::runtime::TokioSpawner;
use prometheus_scheduler::util::{Clock, ManualClock};

fn small_config() -> SchedulerConfig {
    SchedulerConfig {
        worker_count: 1,
        ..SchedulerConfig::default()
    }
}

#[test]
fn test_builder_keeps_config() {
    let builder = SchedulerBuilder::new(small_config().with_resource("gpt", 2, 1));
    assert_eq!(builder.config().worker_count, 1);
    assert_eq!(builder.config().resources["gpt"].limit, 2);
}

#[tokio::test]
async fn test_builder_preconfigures_resources() {
    let scheduler = SchedulerBuilder::new(small_config().with_resource("gpt", 2, 1))
        .build(TokioSpawner::current().unwrap())
        .unwrap();

    let snapshot = scheduler.admission().snapshot("gpt").unwrap();
    assert_eq!(snapshot.limit, 2);
    assert_eq!(snapshot.window, Duration::from_secs(1));
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        max_queue_depth: 0,
        ..small_config()
    };
    let result = build_scheduler(&cfg, TokioSpawner::current().unwrap());
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_builder_with_custom_parts() {
    let clock = ManualClock::new();
    let scheduler = SchedulerBuilder::new(small_config())
        .with_clock(Arc::new(clock.clone()))
        .with_queue(Box::new(InMemoryQueue::new(1)))
        .with_hook(|_event: &TaskEvent| {})
        .build(TokioSpawner::current().unwrap())
        .unwrap();

    assert_eq!(scheduler.clock().now(), clock.now());

    let noop = || {
        prometheus_scheduler::core::TaskDescriptor::from_fn(|_ctx| async {
            Ok(serde_json::Value::Null)
        })
    };
    scheduler.submit(noop()).unwrap();
    // The custom queue holds a single task.
    assert!(matches!(
        scheduler.submit(noop()),
        Err(SchedulerError::QueueFull(_))
    ));
    scheduler.shutdown().await;
}
