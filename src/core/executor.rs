//! Task payload contract.

use std::future::Future;

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::core::task::{TaskId, TaskOutput};
use crate::util::clock::Timestamp;

/// Context handed to a payload for one run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Task identifier.
    pub task_id: TaskId,
    /// Optional label.
    pub name: Option<String>,
    /// 1-based run number.
    pub run: u64,
    /// Gated resource, if any.
    pub resource: Option<String>,
    /// Due time this run was dispatched for.
    pub scheduled_for: Timestamp,
}

/// Work performed when a task runs.
///
/// The scheduler never inspects a payload; it only calls [`TaskPayload::run`]
/// once per dispatch. Recurring tasks call `run` on the same payload each time.
///
/// # Threading
///
/// `run` executes on a dedicated worker thread with its own single-threaded
/// tokio runtime. Payloads may await or block; blocking only occupies that
/// worker.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_scheduler::core::{AppResult, TaskContext, TaskOutput, TaskPayload};
///
/// struct Translate {
///     text: String,
/// }
///
/// #[async_trait]
/// impl TaskPayload for Translate {
///     async fn run(&self, ctx: TaskContext) -> AppResult<TaskOutput> {
///         Ok(serde_json::json!({ "task": ctx.task_id, "text": self.text }))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskPayload: Send + Sync + 'static {
    /// Run the work once. Errors are reported as failed outcomes.
    async fn run(&self, ctx: TaskContext) -> AppResult<TaskOutput>;
}

/// Payload built from an async closure.
pub struct FnPayload<F> {
    f: F,
}

impl<F> FnPayload<F> {
    /// Wrap a closure returning a future.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TaskPayload for FnPayload<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<TaskOutput>> + Send + 'static,
{
    async fn run(&self, ctx: TaskContext) -> AppResult<TaskOutput> {
        (self.f)(ctx).await
    }
}
