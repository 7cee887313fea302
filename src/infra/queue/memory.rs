//! In-memory queue ordered by due time, priority and insertion order.

use std::collections::{BTreeMap, HashMap};

use crate::core::{Priority, ScheduledTask, SchedulerError, TaskId, TaskQueue};
use crate::util::clock::Timestamp;

/// Sort key; field order defines queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    due_at: Timestamp,
    priority: Priority,
    seq: u64,
}

/// In-memory queue backed by an ordered map with an id index.
/// Enqueue, pop and remove are O(log n).
pub struct InMemoryQueue {
    max_depth: usize,
    tasks: BTreeMap<QueueKey, ScheduledTask>,
    index: HashMap<TaskId, QueueKey>,
    next_seq: u64,
}

impl InMemoryQueue {
    /// Create a new in-memory queue with a maximum depth.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            tasks: BTreeMap::new(),
            index: HashMap::with_capacity(max_depth.min(1024)),
            next_seq: 0,
        }
    }

    /// Ids in dispatch order.
    #[must_use]
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.values().map(|t| t.meta.id).collect()
    }
}

impl TaskQueue for InMemoryQueue {
    fn enqueue(&mut self, task: ScheduledTask) -> Result<(), SchedulerError> {
        if self.len() >= self.max_depth() {
            return Err(SchedulerError::QueueFull("max queue depth reached".into()));
        }
        if self.index.contains_key(&task.meta.id) {
            return Err(SchedulerError::AlreadyQueued(task.meta.id));
        }
        let key = QueueKey {
            due_at: task.meta.due_at,
            priority: task.meta.priority,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.index.insert(task.meta.id, key);
        self.tasks.insert(key, task);
        Ok(())
    }

    fn peek_due(&self, now: Timestamp) -> Option<&ScheduledTask> {
        self.tasks
            .first_key_value()
            .filter(|(key, _)| key.due_at <= now)
            .map(|(_, task)| task)
    }

    fn pop(&mut self, now: Timestamp) -> Option<ScheduledTask> {
        let (key, _) = self.tasks.first_key_value()?;
        if key.due_at > now {
            return None;
        }
        let (_, task) = self.tasks.pop_first()?;
        self.index.remove(&task.meta.id);
        Some(task)
    }

    fn remove(&mut self, id: TaskId) -> bool {
        self.index
            .remove(&id)
            .and_then(|key| self.tasks.remove(&key))
            .is_some()
    }

    fn next_due(&self) -> Option<Timestamp> {
        self.tasks.first_key_value().map(|(key, _)| key.due_at)
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}
