//! Queue abstraction for pending tasks.

use crate::core::error::SchedulerError;
use crate::core::task::{ScheduledTask, TaskId};
use crate::util::clock::Timestamp;

/// Ordered container of tasks waiting for their due time.
///
/// Implementations order by `(due_at, priority, insertion sequence)`: earliest
/// due first, then lower priority value, then first inserted. The scheduler
/// wraps the queue in its own mutex, so methods take `&mut self`.
pub trait TaskQueue: Send {
    /// Add a task.
    ///
    /// # Errors
    ///
    /// `QueueFull` at maximum depth, `AlreadyQueued` if the id is present.
    fn enqueue(&mut self, task: ScheduledTask) -> Result<(), SchedulerError>;

    /// Head of the queue if it is due at `now`.
    fn peek_due(&self, now: Timestamp) -> Option<&ScheduledTask>;

    /// Remove and return the head if it is due at `now`.
    fn pop(&mut self, now: Timestamp) -> Option<ScheduledTask>;

    /// Remove a task that has not been dispatched yet.
    fn remove(&mut self, id: TaskId) -> bool;

    /// Due time of the head, due or not.
    fn next_due(&self) -> Option<Timestamp>;

    /// Maximum depth allowed for this queue.
    fn max_depth(&self) -> usize;

    /// Current depth.
    fn len(&self) -> usize;

    /// True when no task is waiting.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
