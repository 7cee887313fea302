//! Tests for utility functions

use std::time::Duration;

use prometheus_scheduler::util::{init_tracing_with, now_ms, Clock, ManualClock, SystemClock};

#[test]
fn test_manual_clock_only_moves_when_advanced() {
    let clock = ManualClock::new();
    let start = clock.now();
    assert_eq!(clock.now(), start);

    clock.advance(Duration::from_secs(95));
    assert_eq!(clock.now() - start, Duration::from_secs(95));
    assert_eq!(clock.elapsed(), Duration::from_secs(95));
}

#[test]
fn test_manual_clock_clones_share_time() {
    let clock = ManualClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_millis(250));
    assert_eq!(other.elapsed(), Duration::from_millis(250));
}

#[test]
fn test_system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn test_now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with("prometheus_scheduler=debug");
    init_tracing_with("prometheus_scheduler=debug");
}
