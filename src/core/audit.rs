//! Audit sink implementations.
//!
//! Records every lifecycle transition the scheduler makes so operators can
//! reconstruct what happened to a task (submit, rate_limited, dispatch,
//! complete, fail, requeue, retire, cancel).

use std::collections::VecDeque;

use crate::core::task::TaskId;
use crate::util::clock::now_ms;

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task identifier.
    pub task_id: TaskId,
    /// Task label.
    pub task: String,
    /// Gated resource, if any.
    pub resource: Option<String>,
    /// Action taken.
    pub action: String,
    /// Wall-clock timestamp in milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Events recorded for one task, oldest first.
    #[must_use]
    pub fn events_for(&self, task_id: TaskId) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Sink that emits each event as a `tracing` record.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "prometheus_scheduler::audit",
            task_id = event.task_id,
            task = %event.task,
            resource = event.resource.as_deref().unwrap_or("-"),
            action = %event.action,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    task_id: TaskId,
    task: impl Into<String>,
    resource: Option<&str>,
    action: impl Into<String>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        task_id,
        task: task.into(),
        resource: resource.map(str::to_string),
        action: action.into(),
        created_at_ms: now_ms(),
        detail,
    }
}
