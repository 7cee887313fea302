//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::task::TaskId;
use crate::core::worker_pool::PoolError;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Admission window for the resource is full.
    #[error("rate limit exceeded for resource `{0}`")]
    RateLimitExceeded(String),
    /// A task payload returned an error or panicked.
    #[error("task payload error: {0}")]
    TaskPayload(String),
    /// No task with this id is known (never submitted or already pruned).
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    /// Recurrence descriptor rejected at submit time.
    #[error("invalid recurrence: {0}")]
    InvalidRecurrence(String),
    /// Task descriptor rejected at submit time.
    #[error("invalid task: {0}")]
    InvalidTask(String),
    /// Queue is at its configured depth.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// The task is already waiting in the queue.
    #[error("task {0} is already queued")]
    AlreadyQueued(TaskId),
    /// `start` was called on a scheduler that is not stopped.
    #[error("scheduler is already running")]
    AlreadyRunning,
    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Worker pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Result type returned by task payloads.
pub type AppResult<T> = Result<T, anyhow::Error>;
