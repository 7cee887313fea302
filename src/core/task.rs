//! Task data model: identifiers, descriptors, lifecycle states and outcomes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{AppResult, SchedulerError};
use crate::core::executor::{FnPayload, TaskContext, TaskPayload};
use crate::core::recurrence::Recurrence;
use crate::util::clock::Timestamp;

/// Unique task identifier, assigned by the scheduler.
pub type TaskId = u64;

/// Value produced by a successful payload run.
pub type TaskOutput = serde_json::Value;

/// Task priority. Lower values are dispatched first among tasks due at the
/// same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub i32);

impl Priority {
    /// Dispatched ahead of normal work.
    pub const HIGH: Self = Self(-10);
    /// Default priority.
    pub const NORMAL: Self = Self(0);
    /// Dispatched after normal work.
    pub const LOW: Self = Self(10);
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, not yet in the queue.
    Pending,
    /// Waiting in the queue for its due time.
    Queued,
    /// Popped and admitted, being handed to a worker.
    Admitted,
    /// Executing on a worker.
    Running,
    /// One-shot task finished successfully.
    Completed,
    /// One-shot task finished with an error.
    Failed,
    /// Cancelled before it started running.
    Cancelled,
    /// Recurring task with no further runs.
    Retired,
}

impl TaskState {
    /// True for states a task never leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Retired
        )
    }
}

/// When a task first becomes due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Start {
    /// Due as soon as it is submitted.
    #[default]
    Immediately,
    /// Due at an absolute instant.
    At(Timestamp),
    /// Due after a delay measured from submission.
    After(Duration),
}

impl Start {
    /// Resolve to an absolute due time. `None` if the delay runs past the
    /// clock's range.
    #[must_use]
    pub fn resolve(self, now: Timestamp) -> Option<Timestamp> {
        match self {
            Self::Immediately => Some(now),
            Self::At(at) => Some(at),
            Self::After(delay) => now.checked_add(delay),
        }
    }
}

/// Producer-facing description of a unit of work.
#[derive(Clone)]
pub struct TaskDescriptor {
    /// Optional label used in logs and events.
    pub name: Option<String>,
    /// Dispatch priority, default `0`.
    pub priority: Priority,
    /// Recurrence rule, default one-shot.
    pub recurrence: Recurrence,
    /// Gated resource the task calls, if any.
    pub resource: Option<String>,
    /// First due time.
    pub start: Start,
    /// Opaque work callback.
    pub payload: Arc<dyn TaskPayload>,
}

impl TaskDescriptor {
    /// Describe a one-shot, ungated task with default priority.
    pub fn new(payload: impl TaskPayload) -> Self {
        Self::from_arc(Arc::new(payload))
    }

    /// Describe a task from a shared payload.
    pub fn from_arc(payload: Arc<dyn TaskPayload>) -> Self {
        Self {
            name: None,
            priority: Priority::default(),
            recurrence: Recurrence::None,
            resource: None,
            start: Start::Immediately,
            payload,
        }
    }

    /// Describe a task whose payload is an async closure.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<TaskOutput>> + Send + 'static,
    {
        Self::new(FnPayload::new(f))
    }

    /// Set the task label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Set the recurrence rule.
    #[must_use]
    pub const fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    /// Gate the task behind a named resource.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the first due time.
    #[must_use]
    pub const fn with_start(mut self, start: Start) -> Self {
        self.start = start;
        self
    }

    /// Check the descriptor and compute its first due time.
    ///
    /// # Errors
    ///
    /// `InvalidTask` for an empty resource name or a start delay past the
    /// clock's range, `InvalidRecurrence` for a malformed recurrence rule.
    pub fn initial_due(&self, now: Timestamp) -> Result<Timestamp, SchedulerError> {
        if let Some(resource) = &self.resource {
            if resource.trim().is_empty() {
                return Err(SchedulerError::InvalidTask(
                    "resource name must not be empty".into(),
                ));
            }
        }
        self.recurrence.validate(self.start, now)?;
        self.recurrence
            .initial_due(self.start, now)
            .ok_or_else(|| SchedulerError::InvalidTask("start delay is out of range".into()))
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("recurrence", &self.recurrence)
            .field("resource", &self.resource)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

/// Scheduling metadata carried with a queued task.
#[derive(Debug, Clone)]
pub struct TaskMetadata {
    /// Task identifier.
    pub id: TaskId,
    /// Optional label.
    pub name: Option<String>,
    /// Dispatch priority.
    pub priority: Priority,
    /// Time at which the task becomes eligible.
    pub due_at: Timestamp,
    /// Recurrence rule.
    pub recurrence: Recurrence,
    /// Gated resource, if any.
    pub resource: Option<String>,
}

impl TaskMetadata {
    /// Label for log lines: the name if set, otherwise the id.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("task-{}", self.id))
    }
}

/// A task instance as it moves between the queue and the worker pool.
#[derive(Clone)]
pub struct ScheduledTask {
    /// Metadata driving scheduling decisions.
    pub meta: TaskMetadata,
    /// Work callback.
    pub payload: Arc<dyn TaskPayload>,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a task's registry record.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    /// Task identifier.
    pub id: TaskId,
    /// Optional label.
    pub name: Option<String>,
    /// Dispatch priority.
    pub priority: Priority,
    /// Recurrence rule.
    pub recurrence: Recurrence,
    /// Gated resource, if any.
    pub resource: Option<String>,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Current (or last) due time.
    pub due_at: Timestamp,
    /// Dispatch time of the most recent run.
    pub last_run_at: Option<Timestamp>,
    /// Completed runs, successful or not.
    pub run_count: u64,
    /// Error from the most recent failed run; cleared by a successful run.
    pub last_error: Option<String>,
    /// Times dispatch was deferred because the resource window was full.
    pub admission_denials: u64,
    /// Cancellation arrived while the task was in flight.
    pub cancel_requested: bool,
}

/// Result of a run, as delivered to completion hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum TaskOutcome {
    /// Payload returned a value.
    Completed(TaskOutput),
    /// Payload returned an error or panicked.
    Failed(String),
    /// Task was cancelled before it ran.
    Cancelled,
}

impl TaskOutcome {
    /// True for [`TaskOutcome::Completed`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Notification sent to completion hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Task identifier.
    pub task_id: TaskId,
    /// Optional label.
    pub name: Option<String>,
    /// What happened.
    pub outcome: TaskOutcome,
    /// Completed runs so far, including this one.
    pub run_count: u64,
    /// No further runs will happen for this task.
    pub retired: bool,
}
