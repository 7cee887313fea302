//! Worker pool with dedicated worker threads.
//!
//! The pool runs task payloads off the scheduler's async runtime. Each worker
//! is an OS thread with its own single-threaded tokio runtime, so a payload
//! that blocks or burns CPU only occupies its own worker.
//!
//! Concurrency is bounded by worker slots: the caller reserves a
//! [`WorkerSlot`] before handing a task over, and the slot is released when
//! the run finishes. A task id can be active at most once.
//!
//! ```rust,ignore
//! let pool = WorkerPool::new(&WorkerPoolConfig::new().with_worker_count(4))?;
//! let slot = pool.reserve().await?;
//! pool.submit(task, 1, slot, clock.now(), Box::new(|done| println!("{:?}", done.result)))
//!     .map_err(|(e, _task)| e)?;
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::OwnedSemaphorePermit;

use crate::core::error::AppResult;
use crate::core::task::{ScheduledTask, TaskId, TaskOutput};
use crate::util::clock::Timestamp;

pub use native::WorkerPool;

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has been shut down.
    PoolShutdown,

    /// The task id is already executing.
    AlreadyRunning(TaskId),

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (thread spawn failure, runtime build failure, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::AlreadyRunning(id) => write!(f, "task {id} is already running"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Unreserved worker slots.
    pub idle_slots: usize,

    /// Runs whose payload returned `Ok`.
    pub completed_tasks: u64,

    /// Runs whose payload returned an error or panicked.
    pub failed_tasks: u64,

    /// Runs handed to the pool.
    pub submitted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, idle_slots: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            idle_slots,
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// A reserved worker. Dropping it without submitting releases the slot.
#[derive(Debug)]
pub struct WorkerSlot {
    permit: OwnedSemaphorePermit,
}

impl WorkerSlot {
    pub(crate) const fn new(permit: OwnedSemaphorePermit) -> Self {
        Self { permit }
    }

    pub(crate) fn into_permit(self) -> OwnedSemaphorePermit {
        self.permit
    }
}

/// Result of one run, handed to the submitter's completion callback.
#[derive(Debug)]
pub struct Completion {
    /// The task that ran.
    pub task: ScheduledTask,
    /// 1-based run number.
    pub run: u64,
    /// Dispatch time supplied at submit.
    pub started_at: Timestamp,
    /// Payload result. Panics surface as errors.
    pub result: AppResult<TaskOutput>,
    /// Worker that ran the task.
    pub worker_id: usize,
}

/// Callback invoked on the worker thread once a run finishes.
pub type CompletionFn = Box<dyn FnOnce(Completion) + Send + 'static>;

/// A unit of work sent to the worker threads.
pub(crate) struct WorkerJob {
    pub task: ScheduledTask,
    pub run: u64,
    pub started_at: Timestamp,
    pub permit: OwnedSemaphorePermit,
    pub on_complete: CompletionFn,
}
