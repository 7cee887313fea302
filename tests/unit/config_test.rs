//! Tests for configuration validation

use prometheus_scheduler::config::{ResourceLimitConfig, SchedulerConfig, WorkerPoolConfig};

#[test]
fn test_scheduler_config_defaults() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.worker_count >= 1);
    assert_eq!(cfg.max_queue_depth, 10_000);
    assert_eq!(cfg.poll_interval_ms, 100);
    assert_eq!(cfg.backoff_interval_ms, 250);
    assert_eq!(cfg.admission_poll_interval_ms, 100);
    assert_eq!(cfg.thread_stack_size, 2 * 1024 * 1024);
    assert!(cfg.resources.is_empty());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_queue_depth() {
    let cfg = SchedulerConfig {
        max_queue_depth: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_worker_count() {
    let cfg = SchedulerConfig {
        worker_count: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_resource_limit_validation() {
    let cfg = SchedulerConfig::default().with_resource("gpt", 0, 60);
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("gpt"));

    let cfg = SchedulerConfig::default().with_resource("gpt", 5, 0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_json_parsing_fills_defaults() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "worker_count": 2,
            "resources": { "gemini": { "limit": 60, "window_secs": 60 } }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.worker_count, 2);
    assert_eq!(cfg.backoff_interval_ms, 250);
    assert_eq!(
        cfg.resources["gemini"],
        ResourceLimitConfig {
            limit: 60,
            window_secs: 60
        }
    );
}

#[test]
fn test_json_parsing_rejects_invalid_values() {
    assert!(SchedulerConfig::from_json_str(r#"{ "poll_interval_ms": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_worker_pool_config_from_scheduler_config() {
    let cfg = SchedulerConfig {
        worker_count: 3,
        ..SchedulerConfig::default()
    };
    let pool = cfg.worker_pool();
    assert_eq!(pool, WorkerPoolConfig::new().with_worker_count(3));
}
