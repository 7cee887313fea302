//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker thread owns a single-threaded tokio runtime and blocks on a
//! shared crossbeam channel. Capacity is a semaphore with one permit per
//! worker, so a job is only sent once a worker is guaranteed to be free.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel recv; waiters use `Notify`
//! - **Panic isolation**: payloads run inside `tokio::spawn`, so a panic
//!   comes back as a `JoinError` and the worker keeps going
//! - **Clean shutdown**: dropping the sender lets workers drain and exit

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::anyhow;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::error::AppResult;
use crate::core::executor::TaskContext;
use crate::core::task::{ScheduledTask, TaskId, TaskOutput};
use crate::util::clock::Timestamp;

use super::{Completion, CompletionFn, PoolCounters, PoolError, PoolStats, WorkerJob, WorkerSlot};

/// How long `shutdown` waits for each worker thread to exit.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Worker pool with dedicated OS threads.
///
/// At most `worker_count` tasks execute at once, and a given task id is
/// never executing twice.
pub struct WorkerPool {
    /// Number of worker threads.
    worker_count: usize,

    /// Job sender. `None` once shut down.
    task_tx: Mutex<Option<Sender<WorkerJob>>>,

    /// One permit per worker.
    slots: Arc<Semaphore>,

    /// Ids whose payload is currently executing.
    active: Arc<Mutex<HashSet<TaskId>>>,

    /// Signalled whenever a run has fully finished.
    idle: Arc<Notify>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<PoolCounters>,

    /// Shutdown flag.
    shutdown: AtomicBool,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool and spawn `config.worker_count` threads.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a bad configuration, `Internal` if a thread
    /// cannot be spawned.
    pub fn new(config: &WorkerPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = unbounded::<WorkerJob>();
        let active = Arc::new(Mutex::new(HashSet::with_capacity(config.worker_count)));
        let idle = Arc::new(Notify::new());
        let counters = Arc::new(PoolCounters::default());

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = spawn_worker(
                worker_id,
                task_rx.clone(),
                Arc::clone(&active),
                Arc::clone(&idle),
                Arc::clone(&counters),
                config.thread_stack_size,
            )?;
            workers.push(worker);
        }

        info!(
            worker_count = config.worker_count,
            thread_stack_size = config.thread_stack_size,
            "worker pool started"
        );

        Ok(Self {
            worker_count: config.worker_count,
            task_tx: Mutex::new(Some(task_tx)),
            slots: Arc::new(Semaphore::new(config.worker_count)),
            active,
            idle,
            counters,
            shutdown: AtomicBool::new(false),
            workers: Mutex::new(workers),
        })
    }

    /// Wait until a worker is free and reserve it.
    ///
    /// # Errors
    ///
    /// `PoolShutdown` if the pool is (or becomes) shut down.
    pub async fn reserve(&self) -> Result<WorkerSlot, PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map(WorkerSlot::new)
            .map_err(|_| PoolError::PoolShutdown)
    }

    /// Reserve a worker if one is free right now.
    #[must_use]
    pub fn try_reserve(&self) -> Option<WorkerSlot> {
        if self.shutdown.load(Ordering::Acquire) {
            return None;
        }
        Arc::clone(&self.slots).try_acquire_owned().ok().map(WorkerSlot::new)
    }

    /// Hand a task to the reserved worker.
    ///
    /// `run` is the 1-based run number passed to the payload. `on_complete`
    /// is called on the worker thread after the payload returns; the slot is
    /// released after the callback.
    ///
    /// # Errors
    ///
    /// Returns the error together with the task so the caller can requeue
    /// it: `AlreadyRunning` if the id is executing, `PoolShutdown` after
    /// shutdown.
    pub fn submit(
        &self,
        task: ScheduledTask,
        run: u64,
        slot: WorkerSlot,
        started_at: Timestamp,
        on_complete: CompletionFn,
    ) -> Result<(), (PoolError, ScheduledTask)> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err((PoolError::PoolShutdown, task));
        }

        let task_id = task.meta.id;
        if !self.active.lock().insert(task_id) {
            return Err((PoolError::AlreadyRunning(task_id), task));
        }

        let job = WorkerJob {
            task,
            run,
            started_at,
            permit: slot.into_permit(),
            on_complete,
        };

        // Counted before sending so the worker's decrement cannot run first.
        self.counters.active_tasks.fetch_add(1, Ordering::AcqRel);
        let sent = {
            let task_tx = self.task_tx.lock();
            match task_tx.as_ref() {
                Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
                None => Err(job),
            }
        };

        match sent {
            Ok(()) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(task_id, run, "task handed to worker pool");
                Ok(())
            }
            Err(job) => {
                self.counters.active_tasks.fetch_sub(1, Ordering::AcqRel);
                self.active.lock().remove(&task_id);
                Err((PoolError::PoolShutdown, job.task))
            }
        }
    }

    /// Number of payloads currently executing.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// True while the task's payload is executing.
    #[must_use]
    pub fn is_active(&self, id: TaskId) -> bool {
        self.active.lock().contains(&id)
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Wait until no run is in flight, completion callbacks included.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.counters.active_tasks.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters
            .snapshot(self.worker_count, self.slots.available_permits())
    }

    /// True once `shutdown` has been called or the pool was dropped.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Shut down the pool.
    ///
    /// Pending `reserve` calls fail, workers finish jobs already handed to
    /// them, then exit. Each worker is given a bounded time to join; one
    /// that does not exit in time is detached.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down worker pool");
        self.slots.close();
        self.task_tx.lock().take();

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            if worker.thread().id() == thread::current().id() {
                warn!(worker_id = idx, "shutdown called from a worker thread; detaching it");
                continue;
            }
            let (tx, rx) = std::sync::mpsc::channel();
            let joiner = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(JOIN_TIMEOUT) {
                Ok(true) => debug!(worker_id = idx, "worker joined"),
                Ok(false) => warn!(worker_id = idx, "worker panicked"),
                Err(_) => {
                    warn!(worker_id = idx, "worker did not exit within timeout; detaching");
                    continue;
                }
            }
            let _ = joiner.join();
        }

        info!(worker_count, "worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal only; explicit shutdown() joins.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.slots.close();
            self.task_tx.lock().take();
            debug!("worker pool dropped without explicit shutdown; workers detached");
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    worker_id: usize,
    task_rx: Receiver<WorkerJob>,
    active: Arc<Mutex<HashSet<TaskId>>>,
    idle: Arc<Notify>,
    counters: Arc<PoolCounters>,
    stack_size: usize,
) -> Result<JoinHandle<()>, PoolError> {
    thread::Builder::new()
        .name(format!("sched-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "worker thread started");

            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(worker_id, error = %e, "failed to create worker runtime");
                    return;
                }
            };

            // recv fails once the sender is dropped and the channel drained.
            while let Ok(job) = task_rx.recv() {
                let WorkerJob {
                    task,
                    run,
                    started_at,
                    permit,
                    on_complete,
                } = job;
                let task_id = task.meta.id;

                debug!(worker_id, task_id, run, "worker executing task");
                let result = execute(&rt, &task, run);

                if result.is_ok() {
                    counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                }
                active.lock().remove(&task_id);

                let completion = Completion {
                    task,
                    run,
                    started_at,
                    result,
                    worker_id,
                };
                if panic::catch_unwind(AssertUnwindSafe(|| on_complete(completion))).is_err() {
                    error!(worker_id, task_id, "completion callback panicked");
                }

                drop(permit);
                counters.active_tasks.fetch_sub(1, Ordering::AcqRel);
                idle.notify_waiters();
            }

            debug!(worker_id, "worker thread exiting");
        })
        .map_err(|e| PoolError::Internal(format!("failed to spawn worker thread: {e}")))
}

/// Run one payload to completion on the worker's runtime.
fn execute(rt: &tokio::runtime::Runtime, task: &ScheduledTask, run: u64) -> AppResult<TaskOutput> {
    let payload = Arc::clone(&task.payload);
    let ctx = TaskContext {
        task_id: task.meta.id,
        name: task.meta.name.clone(),
        run,
        resource: task.meta.resource.clone(),
        scheduled_for: task.meta.due_at,
    };

    rt.block_on(async move {
        match tokio::spawn(async move { payload.run(ctx).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                let panic = e.into_panic();
                Err(anyhow!("task panicked: {}", panic_message(&*panic)))
            }
            Err(e) => Err(anyhow!("task aborted: {e}")),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::FnPayload;
    use crate::core::recurrence::Recurrence;
    use crate::core::task::{Priority, TaskMetadata};
    use tokio::sync::mpsc;

    fn make_task<F, Fut>(id: TaskId, f: F) -> ScheduledTask
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = AppResult<TaskOutput>> + Send + 'static,
    {
        ScheduledTask {
            meta: TaskMetadata {
                id,
                name: None,
                priority: Priority::NORMAL,
                due_at: tokio::time::Instant::now(),
                recurrence: Recurrence::None,
                resource: None,
            },
            payload: Arc::new(FnPayload::new(f)),
        }
    }

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::new(&WorkerPoolConfig::new().with_worker_count(workers)).unwrap()
    }

    fn forward(tx: &mpsc::UnboundedSender<Completion>) -> CompletionFn {
        let tx = tx.clone();
        Box::new(move |c| {
            let _ = tx.send(c);
        })
    }

    #[tokio::test]
    async fn test_worker_pool_basic() {
        let pool = pool(2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = make_task(1, |ctx| async move { Ok(serde_json::json!({ "run": ctx.run })) });
        let slot = pool.reserve().await.unwrap();
        pool.submit(task, 1, slot, tokio::time::Instant::now(), forward(&tx))
            .map_err(|(e, _)| e)
            .unwrap();

        let done = rx.recv().await.unwrap();
        assert_eq!(done.task.meta.id, 1);
        assert_eq!(done.result.unwrap(), serde_json::json!({ "run": 1 }));

        pool.wait_idle().await;
        let stats = pool.stats();
        assert_eq!(stats.submitted_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.idle_slots, 2);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_payload_panic_is_reported_as_error() {
        let pool = pool(1);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = make_task(9, |ctx| async move {
            if ctx.run > 0 {
                panic!("boom");
            }
            Ok(TaskOutput::Null)
        });
        let slot = pool.reserve().await.unwrap();
        pool.submit(task, 1, slot, tokio::time::Instant::now(), forward(&tx))
            .map_err(|(e, _)| e)
            .unwrap();

        let done = rx.recv().await.unwrap();
        let err = done.result.unwrap_err().to_string();
        assert!(err.contains("boom"), "unexpected error: {err}");

        // The worker survives the panic.
        let task = make_task(10, |_ctx| async move { Ok(TaskOutput::Bool(true)) });
        let slot = pool.reserve().await.unwrap();
        pool.submit(task, 1, slot, tokio::time::Instant::now(), forward(&tx))
            .map_err(|(e, _)| e)
            .unwrap();
        assert!(rx.recv().await.unwrap().result.is_ok());

        pool.wait_idle().await;
        assert_eq!(pool.stats().failed_tasks, 1);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_slots_bound_concurrency() {
        let pool = pool(1);
        let first = pool.try_reserve();
        assert!(first.is_some());
        assert!(pool.try_reserve().is_none());
        drop(first);
        assert!(pool.try_reserve().is_some());
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_same_id_rejected_while_running() {
        let pool = pool(2);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Notify::new());

        let g = Arc::clone(&gate);
        let task = make_task(5, move |_ctx| {
            let g = Arc::clone(&g);
            async move {
                g.notified().await;
                Ok(TaskOutput::Null)
            }
        });
        let duplicate = task.clone();

        let slot = pool.reserve().await.unwrap();
        pool.submit(task, 1, slot, tokio::time::Instant::now(), forward(&tx))
            .map_err(|(e, _)| e)
            .unwrap();
        assert!(pool.is_active(5));

        let slot = pool.reserve().await.unwrap();
        let (err, returned) = pool
            .submit(duplicate, 2, slot, tokio::time::Instant::now(), forward(&tx))
            .unwrap_err();
        assert_eq!(err, PoolError::AlreadyRunning(5));
        assert_eq!(returned.meta.id, 5);

        gate.notify_one();
        rx.recv().await.unwrap();
        pool.wait_idle().await;
        assert!(!pool.is_active(5));
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_reserve_fails_after_shutdown() {
        let pool = pool(1);
        pool.shutdown();
        assert_eq!(pool.reserve().await.unwrap_err(), PoolError::PoolShutdown);
        assert!(pool.try_reserve().is_none());
    }
}
