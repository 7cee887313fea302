//! Builder for [`Scheduler`] instances.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{AuditSink, CompletionHook, Scheduler, SchedulerError, Spawn, TaskQueue};
use crate::infra::queue::InMemoryQueue;
use crate::util::clock::{Clock, SystemClock};

/// Assembles a scheduler from configuration plus optional components.
///
/// Defaults: system clock, an [`InMemoryQueue`] bounded by
/// `max_queue_depth`, no audit sink, no hooks.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    clock: Option<Arc<dyn Clock>>,
    queue: Option<Box<dyn TaskQueue>>,
    audit: Option<Box<dyn AuditSink>>,
    hooks: Vec<Arc<dyn CompletionHook>>,
}

impl SchedulerBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            clock: None,
            queue: None,
            audit: None,
            hooks: Vec::new(),
        }
    }

    /// Configuration the scheduler will be built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Use a specific clock, e.g. a `ManualClock` in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a specific queue implementation.
    #[must_use]
    pub fn with_queue(mut self, queue: Box<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Record lifecycle transitions to an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Register a completion hook before the scheduler starts.
    #[must_use]
    pub fn with_hook(mut self, hook: impl CompletionHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Build the scheduler. The loop is not started.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration fails validation, `Pool` if the
    /// worker threads cannot be started.
    pub fn build<S: Spawn>(self, spawner: S) -> Result<Scheduler<S>, SchedulerError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let queue = self
            .queue
            .unwrap_or_else(|| Box::new(InMemoryQueue::new(self.config.max_queue_depth)));
        Scheduler::from_parts(self.config, clock, queue, self.audit, self.hooks, spawner)
    }
}

/// Build a scheduler from configuration with default components.
///
/// # Errors
///
/// See [`SchedulerBuilder::build`].
pub fn build_scheduler<S: Spawn>(
    cfg: &SchedulerConfig,
    spawner: S,
) -> Result<Scheduler<S>, SchedulerError> {
    SchedulerBuilder::new(cfg.clone()).build(spawner)
}
