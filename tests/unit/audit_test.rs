//! Tests for audit sink

use prometheus_scheduler::core::{build_audit_event, AuditSink, InMemoryAuditSink, TracingAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(1, "digest", Some("gpt"), "submit", Some("detail".to_string()));
    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].task_id, 1);
    assert_eq!(events[0].task, "digest");
    assert_eq!(events[0].resource.as_deref(), Some("gpt"));
    assert_eq!(events[0].action, "submit");
    assert_eq!(events[0].detail.as_deref(), Some("detail"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(1, "a", None, "submit", None));
    sink.record(build_audit_event(2, "b", None, "submit", None));
    sink.record(build_audit_event(3, "c", None, "submit", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, 2); // First one popped
    assert_eq!(events[1].task_id, 3);
}

#[test]
fn test_events_for_filters_by_task() {
    let mut sink = InMemoryAuditSink::new(10);
    sink.record(build_audit_event(1, "a", None, "submit", None));
    sink.record(build_audit_event(2, "b", None, "submit", None));
    sink.record(build_audit_event(1, "a", None, "dispatch", None));

    let actions: Vec<String> = sink.events_for(1).into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["submit", "dispatch"]);
}

#[test]
fn test_event_ids_are_unique() {
    let a = build_audit_event(1, "a", None, "submit", None);
    let b = build_audit_event(1, "a", None, "submit", None);
    assert_ne!(a.event_id, b.event_id);
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(1, "a", Some("gpt"), "rate_limited", None));
}
