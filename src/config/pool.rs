//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Default stack size for worker threads.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Settings for the dedicated worker threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of worker threads, i.e. maximum concurrent task runs.
    pub worker_count: usize,
    /// Stack size per worker thread in bytes.
    pub thread_stack_size: usize,
}

impl WorkerPoolConfig {
    /// Defaults: one worker per CPU, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Validate pool settings.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
