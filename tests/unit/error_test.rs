//! Tests for error types

use prometheus_scheduler::core::{PoolError, SchedulerError};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull("max queue depth reached".to_string());
    assert_eq!(format!("{}", err), "queue full: max queue depth reached");
}

#[test]
fn test_rate_limit_error_names_resource() {
    let err = SchedulerError::RateLimitExceeded("gpt".to_string());
    assert_eq!(format!("{}", err), "rate limit exceeded for resource `gpt`");
}

#[test]
fn test_task_payload_error() {
    let err = SchedulerError::TaskPayload("task panicked: out of memory".to_string());
    assert_eq!(
        format!("{}", err),
        "task payload error: task panicked: out of memory"
    );
}

#[test]
fn test_unknown_task_error() {
    let err = SchedulerError::UnknownTask(42);
    assert_eq!(format!("{}", err), "unknown task: 42");
}

#[test]
fn test_invalid_recurrence_error() {
    let err = SchedulerError::InvalidRecurrence("interval must be greater than zero".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid recurrence: interval must be greater than zero"
    );
}

#[test]
fn test_already_queued_error() {
    let err = SchedulerError::AlreadyQueued(3);
    assert_eq!(format!("{}", err), "task 3 is already queued");
}

#[test]
fn test_pool_error_is_transparent() {
    let err: SchedulerError = PoolError::PoolShutdown.into();
    assert!(matches!(err, SchedulerError::Pool(PoolError::PoolShutdown)));
    assert_eq!(format!("{}", err), "pool has been shut down");
}
