//! Scheduler: producer API, coordination loop and completion path.
//!
//! The scheduler owns a [`TaskQueue`], a registry of task records, an
//! [`AdmissionController`] and a [`WorkerPool`]. A single coordination loop,
//! spawned through [`Spawn`], reserves a worker slot, pops the next due task,
//! gates it through admission and hands it to the pool. Completion callbacks
//! run on the worker thread, update the registry, re-enqueue recurring tasks
//! and notify [`CompletionHook`]s.
//!
//! Locking: the queue mutex, the registry mutex, each admission window mutex
//! and the pool's active set are never held at the same time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::core::admission::AdmissionController;
use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::error::SchedulerError;
use crate::core::events::{ChannelHook, CompletionHook};
use crate::core::queue::TaskQueue;
use crate::core::recurrence::{next_run, Recurrence};
use crate::core::task::{
    ScheduledTask, TaskDescriptor, TaskEvent, TaskId, TaskInfo, TaskMetadata, TaskOutcome,
    TaskState,
};
use crate::core::worker_pool::{Completion, PoolError, PoolStats, WorkerPool, WorkerSlot};
use crate::infra::queue::InMemoryQueue;
use crate::util::clock::{Clock, SystemClock, Timestamp};

/// Abstraction for spawning the coordination loop on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Lifecycle of the coordination loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No loop is running; submitted tasks wait in the queue.
    Stopped,
    /// The loop is dispatching tasks.
    Running,
    /// `stop` was called; the loop and in-flight runs are draining.
    Stopping,
}

/// Point-in-time counters for a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Loop state.
    pub state: SchedulerState,
    /// Tasks waiting in the queue.
    pub queue_depth: usize,
    /// Records in the registry, terminal ones included.
    pub tasks_total: usize,
    /// Tasks admitted or executing.
    pub running: usize,
    /// One-shot tasks that completed.
    pub completed: usize,
    /// One-shot tasks whose last run failed.
    pub failed: usize,
    /// Tasks cancelled before they ran.
    pub cancelled: usize,
    /// Recurring tasks with no further runs.
    pub retired: usize,
    /// Admission denials across all tasks.
    pub admission_denials: u64,
    /// Worker pool counters.
    pub pool: PoolStats,
}

/// Task scheduling and admission-control engine.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new(SchedulerConfig::default())
///     .build(TokioSpawner::current()?)?;
/// scheduler.configure_resource("gpt", 2, Duration::from_secs(1))?;
/// scheduler.start()?;
///
/// let id = scheduler.submit(
///     TaskDescriptor::from_fn(|ctx| async move { Ok(json!({ "run": ctx.run })) })
///         .with_resource("gpt"),
/// )?;
/// ```
pub struct Scheduler<S: Spawn> {
    inner: Arc<Inner>,
    spawner: S,
}

struct Inner {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    queue: Mutex<Box<dyn TaskQueue>>,
    registry: Mutex<HashMap<TaskId, TaskInfo>>,
    admission: AdmissionController,
    pool: WorkerPool,
    hooks: RwLock<Vec<Arc<dyn CompletionHook>>>,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
    state: Mutex<SchedulerState>,
    /// Wakes the loop on submit, cancel, re-enqueue and stop.
    wake: Notify,
    /// Signalled when the loop exits.
    loop_done: Notify,
    loop_active: AtomicBool,
    next_id: AtomicU64,
}

impl<S: Spawn> Scheduler<S> {
    /// Create a scheduler with the system clock and an in-memory queue.
    ///
    /// Resources listed in `config.resources` are configured up front.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration fails validation, `Pool` if the
    /// worker threads cannot be started.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, SchedulerError> {
        let queue = Box::new(InMemoryQueue::new(config.max_queue_depth));
        Self::from_parts(config, Arc::new(SystemClock), queue, None, Vec::new(), spawner)
    }

    pub(crate) fn from_parts(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        queue: Box<dyn TaskQueue>,
        audit: Option<Box<dyn AuditSink>>,
        hooks: Vec<Arc<dyn CompletionHook>>,
        spawner: S,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let admission = AdmissionController::with_clock(Arc::clone(&clock))
            .with_poll_interval(config.admission_poll_interval());
        for (name, limit) in &config.resources {
            admission.configure(name, limit.limit, limit.window())?;
        }

        let pool = WorkerPool::new(&config.worker_pool())?;

        info!(
            worker_count = config.worker_count,
            max_queue_depth = queue.max_depth(),
            resources = config.resources.len(),
            "scheduler created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                clock,
                queue: Mutex::new(queue),
                registry: Mutex::new(HashMap::new()),
                admission,
                pool,
                hooks: RwLock::new(hooks),
                audit: audit.map(Mutex::new),
                state: Mutex::new(SchedulerState::Stopped),
                wake: Notify::new(),
                loop_done: Notify::new(),
                loop_active: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
            spawner,
        })
    }

    /// Start the coordination loop.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` unless the scheduler is stopped, `Pool` once the
    /// worker pool has been shut down.
    pub fn start(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.inner.state.lock();
            if *state != SchedulerState::Stopped {
                return Err(SchedulerError::AlreadyRunning);
            }
            if self.inner.pool.is_shutdown() {
                return Err(PoolError::PoolShutdown.into());
            }
            *state = SchedulerState::Running;
            self.inner.loop_active.store(true, Ordering::Release);
        }

        self.spawner.spawn(run_loop(Arc::clone(&self.inner)));
        info!("scheduler started");
        Ok(())
    }

    /// Stop dispatching and wait for in-flight runs to finish.
    ///
    /// Queued tasks stay queued; `start` resumes them. Running payloads are
    /// never interrupted.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            match *state {
                SchedulerState::Stopped => return,
                SchedulerState::Running => *state = SchedulerState::Stopping,
                SchedulerState::Stopping => {}
            }
        }
        info!("scheduler stopping");
        self.inner.wake.notify_one();

        loop {
            let done = self.inner.loop_done.notified();
            tokio::pin!(done);
            done.as_mut().enable();
            if !self.inner.loop_active.load(Ordering::Acquire) {
                break;
            }
            done.await;
        }

        self.inner.pool.wait_idle().await;
        *self.inner.state.lock() = SchedulerState::Stopped;
        info!("scheduler stopped");
    }

    /// Stop, then join the worker threads. The scheduler cannot be
    /// restarted afterwards.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.inner.pool.shutdown();
    }

    /// Accept a task and return its id.
    ///
    /// # Errors
    ///
    /// `InvalidRecurrence` or `InvalidTask` for a malformed descriptor,
    /// `QueueFull` at maximum queue depth.
    pub fn submit(&self, descriptor: TaskDescriptor) -> Result<TaskId, SchedulerError> {
        let now = self.inner.clock.now();
        let due_at = descriptor.initial_due(now)?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let TaskDescriptor {
            name,
            priority,
            recurrence,
            resource,
            payload,
            ..
        } = descriptor;

        let meta = TaskMetadata {
            id,
            name,
            priority,
            due_at,
            recurrence,
            resource,
        };

        // Registered as Queued before the enqueue so the loop never pops an
        // unknown id.
        self.inner.registry.lock().insert(
            id,
            TaskInfo {
                id,
                name: meta.name.clone(),
                priority,
                recurrence,
                resource: meta.resource.clone(),
                state: TaskState::Queued,
                due_at,
                last_run_at: None,
                run_count: 0,
                last_error: None,
                admission_denials: 0,
                cancel_requested: false,
            },
        );

        let label = meta.label();
        let resource = meta.resource.clone();
        let enqueued = self.inner.queue.lock().enqueue(ScheduledTask { meta, payload });
        if let Err(e) = enqueued {
            self.inner.registry.lock().remove(&id);
            warn!(task_id = id, error = %e, "task rejected");
            return Err(e);
        }

        debug!(task_id = id, task = %label, priority = %priority, "task submitted");
        self.inner
            .record(id, &label, resource.as_deref(), "submit", None);
        self.inner.wake.notify_one();
        Ok(id)
    }

    /// Cancel a task.
    ///
    /// A queued task is removed and reported as [`TaskOutcome::Cancelled`].
    /// A task already handed to a worker keeps running; only its re-enqueue
    /// is suppressed.
    ///
    /// Returns `Ok(true)` if the cancellation took effect, `Ok(false)` if
    /// the task had already finished.
    ///
    /// # Errors
    ///
    /// `UnknownTask` if the id was never issued or has been pruned.
    pub fn cancel(&self, id: TaskId) -> Result<bool, SchedulerError> {
        let event = {
            let mut registry = self.inner.registry.lock();
            let info = registry
                .get_mut(&id)
                .ok_or(SchedulerError::UnknownTask(id))?;
            match info.state {
                state if state.is_terminal() => return Ok(false),
                TaskState::Admitted | TaskState::Running => {
                    info.cancel_requested = true;
                    let label = label_of(info);
                    let resource = info.resource.clone();
                    drop(registry);
                    info!(task_id = id, task = %label, "cancel requested for in-flight task");
                    self.inner
                        .record(id, &label, resource.as_deref(), "cancel_requested", None);
                    return Ok(true);
                }
                _ => {
                    info.state = TaskState::Cancelled;
                    cancelled_event(info)
                }
            }
        };

        self.inner.queue.lock().remove(id);
        self.inner.finish_cancelled(event);
        self.inner.wake.notify_one();
        Ok(true)
    }

    /// Current lifecycle state of a task.
    ///
    /// # Errors
    ///
    /// `UnknownTask` if the id was never issued or has been pruned.
    pub fn status(&self, id: TaskId) -> Result<TaskState, SchedulerError> {
        self.inner
            .registry
            .lock()
            .get(&id)
            .map(|info| info.state)
            .ok_or(SchedulerError::UnknownTask(id))
    }

    /// Snapshot of a task's record.
    ///
    /// # Errors
    ///
    /// `UnknownTask` if the id was never issued or has been pruned.
    pub fn task_info(&self, id: TaskId) -> Result<TaskInfo, SchedulerError> {
        self.inner
            .registry
            .lock()
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::UnknownTask(id))
    }

    /// Snapshot of every known task, ordered by id.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self.inner.registry.lock().values().cloned().collect();
        tasks.sort_by_key(|info| info.id);
        tasks
    }

    /// Set the admission limit for a resource. Idempotent; last write wins.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a zero limit or window.
    pub fn configure_resource(
        &self,
        name: &str,
        limit: usize,
        window: Duration,
    ) -> Result<(), SchedulerError> {
        self.inner.admission.configure(name, limit, window)
    }

    /// Register a hook called for every finished run and cancellation.
    pub fn on_completion(&self, hook: impl CompletionHook + 'static) {
        self.inner.hooks.write().push(Arc::new(hook));
    }

    /// Receive every [`TaskEvent`] from now on through a channel.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TaskEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_completion(ChannelHook::new(tx));
        rx
    }

    /// Loop state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.inner.state.lock()
    }

    /// Counters for queue, registry and worker pool.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let queue_depth = self.inner.queue.lock().len();
        let mut stats = SchedulerStats {
            state: self.state(),
            queue_depth,
            tasks_total: 0,
            running: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            retired: 0,
            admission_denials: 0,
            pool: self.inner.pool.stats(),
        };

        let registry = self.inner.registry.lock();
        stats.tasks_total = registry.len();
        for info in registry.values() {
            stats.admission_denials += info.admission_denials;
            match info.state {
                TaskState::Admitted | TaskState::Running => stats.running += 1,
                TaskState::Completed => stats.completed += 1,
                TaskState::Failed => stats.failed += 1,
                TaskState::Cancelled => stats.cancelled += 1,
                TaskState::Retired => stats.retired += 1,
                TaskState::Pending | TaskState::Queued => {}
            }
        }
        stats
    }

    /// Drop the records of finished tasks. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut registry = self.inner.registry.lock();
        let before = registry.len();
        registry.retain(|_, info| !info.state.is_terminal());
        let removed = before - registry.len();
        debug!(removed, "pruned finished tasks");
        removed
    }

    /// The admission controller gating resources for this scheduler.
    #[must_use]
    pub fn admission(&self) -> &AdmissionController {
        &self.inner.admission
    }

    /// The clock used for due times and admission windows.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Wake the loop so it re-checks due times now. Useful after advancing
    /// a manual clock.
    pub fn wake(&self) {
        self.inner.wake.notify_one();
    }
}

impl<S: Spawn> Drop for Scheduler<S> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if *state == SchedulerState::Running {
            *state = SchedulerState::Stopping;
            drop(state);
            self.inner.wake.notify_one();
            debug!("scheduler dropped while running; loop signalled to exit");
        }
    }
}

async fn run_loop(inner: Arc<Inner>) {
    let poll = inner.config.poll_interval();
    debug!(poll_interval_ms = inner.config.poll_interval_ms, "scheduler loop started");

    while inner.is_running() {
        // Hold a worker before popping so undispatched tasks stay queued.
        let slot = tokio::select! {
            slot = inner.pool.reserve() => match slot {
                Ok(slot) => slot,
                Err(e) => {
                    error!(error = %e, "worker pool unavailable; scheduler loop exiting");
                    break;
                }
            },
            () = inner.wake.notified() => continue,
        };

        let now = inner.clock.now();
        let popped = inner.queue.lock().pop(now);
        let Some(task) = popped else {
            drop(slot);
            let next_due = inner.queue.lock().next_due();
            let sleep_for =
                next_due.map_or(poll, |due| due.saturating_duration_since(now).min(poll));
            tokio::select! {
                () = tokio::time::sleep(sleep_for) => {}
                () = inner.wake.notified() => {}
            }
            continue;
        };

        inner.dispatch(task, slot, now);
    }

    inner.loop_active.store(false, Ordering::Release);
    inner.loop_done.notify_waiters();
    debug!("scheduler loop exited");
}

impl Inner {
    fn is_running(&self) -> bool {
        *self.state.lock() == SchedulerState::Running
    }

    /// Take a popped task through admission and into the worker pool.
    fn dispatch(self: &Arc<Self>, task: ScheduledTask, slot: WorkerSlot, now: Timestamp) {
        let id = task.meta.id;

        {
            let mut registry = self.registry.lock();
            match registry.get_mut(&id) {
                Some(info) if info.state == TaskState::Queued => info.state = TaskState::Admitted,
                _ => {
                    debug!(task_id = id, "popped task is no longer queued; dropped");
                    return;
                }
            }
        }

        self.dispatch_admitted(task, slot, now);
    }

    /// Admission check, last cancel check and hand-off for a task already
    /// marked `Admitted`.
    fn dispatch_admitted(
        self: &Arc<Self>,
        task: ScheduledTask,
        slot: WorkerSlot,
        now: Timestamp,
    ) {
        let id = task.meta.id;

        if let Some(resource) = task.meta.resource.as_deref() {
            if !self.admission.try_admit(resource, now) {
                self.defer(task, now);
                return;
            }
        }

        let run = {
            let mut registry = self.registry.lock();
            let Some(info) = registry.get_mut(&id) else {
                return;
            };
            if info.cancel_requested {
                info.state = TaskState::Cancelled;
                Err(cancelled_event(info))
            } else {
                info.last_run_at = Some(now);
                Ok(info.run_count + 1)
            }
        };
        let run = match run {
            Ok(run) => run,
            Err(event) => {
                self.finish_cancelled(event);
                return;
            }
        };

        let label = task.meta.label();
        let resource = task.meta.resource.clone();
        // Recorded before the hand-off: the run may finish before submit returns.
        info!(task_id = id, task = %label, run, "task dispatched");
        self.record(id, &label, resource.as_deref(), "dispatch", None);

        let inner = Arc::clone(self);
        match self.pool.submit(
            task,
            run,
            slot,
            now,
            Box::new(move |done| inner.on_finished(done)),
        ) {
            Ok(()) => {
                if let Some(info) = self.registry.lock().get_mut(&id) {
                    if info.state == TaskState::Admitted {
                        info.state = TaskState::Running;
                    }
                }
            }
            Err((e, task)) => {
                warn!(task_id = id, error = %e, "worker pool refused task");
                if let Some(info) = self.registry.lock().get_mut(&id) {
                    info.state = TaskState::Queued;
                }
                match self.requeue(task) {
                    Ok(()) => {
                        let detail = Some(e.to_string());
                        self.record(id, &label, resource.as_deref(), "requeue", detail);
                    }
                    Err(err) => self.fail_requeue_and_emit(id, &err),
                }
            }
        }
    }

    /// Admission denied: push the task back by the backoff interval.
    fn defer(&self, mut task: ScheduledTask, now: Timestamp) {
        let id = task.meta.id;
        let due_at = now
            .checked_add(self.config.backoff_interval())
            .unwrap_or(now);

        let cancelled = {
            let mut registry = self.registry.lock();
            let Some(info) = registry.get_mut(&id) else {
                return;
            };
            info.admission_denials += 1;
            if info.cancel_requested {
                info.state = TaskState::Cancelled;
                Some(cancelled_event(info))
            } else {
                info.state = TaskState::Queued;
                info.due_at = due_at;
                None
            }
        };
        if let Some(event) = cancelled {
            self.finish_cancelled(event);
            return;
        }

        let label = task.meta.label();
        let resource = task.meta.resource.clone().unwrap_or_default();
        debug!(
            task_id = id,
            resource = %resource,
            backoff_ms = self.config.backoff_interval_ms,
            "admission denied; task deferred"
        );
        self.record(id, &label, Some(&resource), "rate_limited", None);

        task.meta.due_at = due_at;
        if let Err(e) = self.requeue(task) {
            self.fail_requeue_and_emit(id, &e);
        }
    }

    /// Put a task back in the queue and wake the loop.
    fn requeue(&self, task: ScheduledTask) -> Result<(), SchedulerError> {
        self.queue.lock().enqueue(task)?;
        self.wake.notify_one();
        Ok(())
    }

    /// Mark a task that could not be re-enqueued as failed. Returns its final
    /// event, or `None` if the task already reached a terminal state.
    fn fail_requeue(&self, id: TaskId, err: &SchedulerError) -> Option<TaskEvent> {
        error!(task_id = id, error = %err, "failed to re-enqueue task");
        let message = format!("re-enqueue failed: {err}");

        let (event, label, resource) = {
            let mut registry = self.registry.lock();
            let info = registry.get_mut(&id)?;
            if info.state.is_terminal() {
                return None;
            }
            info.state = TaskState::Failed;
            info.last_error = Some(message.clone());
            let event = TaskEvent {
                task_id: id,
                name: info.name.clone(),
                outcome: TaskOutcome::Failed(message.clone()),
                run_count: info.run_count,
                retired: true,
            };
            (event, label_of(info), info.resource.clone())
        };

        self.record(id, &label, resource.as_deref(), "fail", Some(message));
        Some(event)
    }

    fn fail_requeue_and_emit(&self, id: TaskId, err: &SchedulerError) {
        if let Some(event) = self.fail_requeue(id, err) {
            self.emit(&event);
        }
    }

    /// Completion path, called on the worker thread after a run.
    fn on_finished(&self, done: Completion) {
        let now = self.clock.now();
        let Completion {
            mut task,
            run,
            started_at,
            result,
            worker_id,
        } = done;
        let id = task.meta.id;

        let outcome = match result {
            Ok(value) => TaskOutcome::Completed(value),
            Err(e) => {
                TaskOutcome::Failed(SchedulerError::TaskPayload(format!("{e:#}")).to_string())
            }
        };

        let (mut event, next) = {
            let mut registry = self.registry.lock();
            let Some(info) = registry.get_mut(&id) else {
                warn!(task_id = id, "finished task has no registry record");
                return;
            };
            info.run_count = run;
            info.last_run_at = Some(started_at);
            info.last_error = match &outcome {
                TaskOutcome::Failed(message) => Some(message.clone()),
                _ => None,
            };

            let next = if info.cancel_requested {
                None
            } else {
                next_run(&info.recurrence, Some(started_at), now)
            };
            info.state = match (next, info.recurrence, &outcome) {
                (Some(_), _, _) => TaskState::Queued,
                (None, Recurrence::None, TaskOutcome::Completed(_)) => TaskState::Completed,
                (None, Recurrence::None, _) => TaskState::Failed,
                (None, _, _) => TaskState::Retired,
            };
            if let Some(due_at) = next {
                info.due_at = due_at;
            }

            let event = TaskEvent {
                task_id: id,
                name: info.name.clone(),
                outcome,
                run_count: run,
                retired: next.is_none(),
            };
            (event, next)
        };

        let label = task.meta.label();
        let resource = task.meta.resource.clone();
        match &event.outcome {
            TaskOutcome::Failed(message) => {
                warn!(task_id = id, task = %label, run, worker_id, error = %message, "task failed");
                self.record(id, &label, resource.as_deref(), "fail", Some(message.clone()));
            }
            _ => {
                info!(task_id = id, task = %label, run, worker_id, "task completed");
                self.record(id, &label, resource.as_deref(), "complete", None);
            }
        }

        if let Some(due_at) = next {
            task.meta.due_at = due_at;
            match self.requeue(task) {
                Ok(()) => {
                    debug!(
                        task_id = id,
                        in_ms = due_at.saturating_duration_since(now).as_millis(),
                        "recurring task requeued"
                    );
                    self.record(id, &label, resource.as_deref(), "requeue", None);
                }
                // One final event: the task will not run again.
                Err(e) => match self.fail_requeue(id, &e) {
                    Some(failed) => event = failed,
                    None => event.retired = true,
                },
            }
        } else if task.meta.recurrence.is_recurring() {
            info!(task_id = id, task = %label, runs = run, "recurring task retired");
            self.record(id, &label, resource.as_deref(), "retire", None);
        }

        self.emit(&event);
    }

    fn finish_cancelled(&self, event: TaskEvent) {
        let label = event
            .name
            .clone()
            .unwrap_or_else(|| format!("task-{}", event.task_id));
        info!(task_id = event.task_id, task = %label, "task cancelled");
        self.record(event.task_id, &label, None, "cancel", None);
        self.emit(&event);
    }

    /// Notify every hook, then drop hooks whose receiver has gone away.
    fn emit(&self, event: &TaskEvent) {
        let hooks: Vec<Arc<dyn CompletionHook>> = self.hooks.read().clone();
        let mut any_closed = false;
        for hook in &hooks {
            hook.on_event(event);
            any_closed |= hook.is_closed();
        }
        drop(hooks);

        if any_closed {
            let mut hooks = self.hooks.write();
            let before = hooks.len();
            hooks.retain(|hook| !hook.is_closed());
            debug!(removed = before - hooks.len(), "closed completion hooks removed");
        }
    }

    fn record(
        &self,
        task_id: TaskId,
        task: &str,
        resource: Option<&str>,
        action: &str,
        detail: Option<String>,
    ) {
        if let Some(audit) = self.audit.as_ref() {
            audit
                .lock()
                .record(build_audit_event(task_id, task, resource, action, detail));
        }
    }
}

fn label_of(info: &TaskInfo) -> String {
    info.name
        .clone()
        .unwrap_or_else(|| format!("task-{}", info.id))
}

fn cancelled_event(info: &TaskInfo) -> TaskEvent {
    TaskEvent {
        task_id: info.id,
        name: info.name.clone(),
        outcome: TaskOutcome::Cancelled,
        run_count: info.run_count,
        retired: true,
    }
}
