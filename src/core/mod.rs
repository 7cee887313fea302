//! Core scheduling abstractions: tasks, queueing, admission, recurrence,
//! worker pool and the scheduler that ties them together.

pub mod admission;
pub mod audit;
pub mod error;
pub mod events;
pub mod executor;
pub mod queue;
pub mod recurrence;
pub mod scheduler;
pub mod task;
pub mod worker_pool;

pub use admission::{AdmissionController, AdmissionSnapshot, AdmissionWindow};
pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use error::{AppResult, SchedulerError};
pub use events::{ChannelHook, CompletionHook};
pub use executor::{FnPayload, TaskContext, TaskPayload};
pub use queue::TaskQueue;
pub use recurrence::{next_run, Recurrence};
pub use scheduler::{Scheduler, SchedulerState, SchedulerStats, Spawn};
pub use task::{
    Priority, ScheduledTask, Start, TaskDescriptor, TaskEvent, TaskId, TaskInfo, TaskMetadata,
    TaskOutcome, TaskOutput, TaskState,
};
pub use worker_pool::{Completion, CompletionFn, PoolError, PoolStats, WorkerPool, WorkerSlot};
