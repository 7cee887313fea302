//! Per-resource sliding-window admission control.
//!
//! Each configured resource owns an [`AdmissionWindow`] guarded by its own
//! mutex, so checks for one resource never contend with another. Resources
//! that were never configured are unlimited.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::core::error::SchedulerError;
use crate::util::clock::{Clock, SystemClock, Timestamp};

/// Default interval between admission attempts in [`AdmissionController::wait_and_admit`].
pub const DEFAULT_ADMISSION_POLL: Duration = Duration::from_millis(100);

/// Rolling record of admissions for one resource.
#[derive(Debug, Clone)]
pub struct AdmissionWindow {
    limit: usize,
    window: Duration,
    timestamps: VecDeque<Timestamp>,
}

impl AdmissionWindow {
    /// Create an empty window allowing `limit` admissions per `window`.
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            timestamps: VecDeque::with_capacity(limit.min(1024)),
        }
    }

    /// Drop admissions that have aged out of the window.
    fn prune(&mut self, now: Timestamp) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record an admission at `now` if the window has room.
    pub fn try_admit(&mut self, now: Timestamp) -> bool {
        self.prune(now);
        if self.timestamps.len() < self.limit {
            self.timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Time until the next admission could succeed; `None` if it would succeed now.
    pub fn retry_after(&mut self, now: Timestamp) -> Option<Duration> {
        self.prune(now);
        if self.timestamps.len() < self.limit {
            return None;
        }
        self.timestamps.front().map(|oldest| {
            oldest
                .checked_add(self.window)
                .map_or(Duration::MAX, |free_at| free_at.saturating_duration_since(now))
        })
    }

    /// Admissions currently counted (as of the last prune).
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when nothing is counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Maximum admissions per window.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    fn reconfigure(&mut self, limit: usize, window: Duration) {
        self.limit = limit;
        self.window = window;
    }
}

/// Point-in-time view of a resource's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    /// Maximum admissions per window.
    pub limit: usize,
    /// Window length.
    pub window: Duration,
    /// Admissions inside the window right now.
    pub in_window: usize,
}

/// Rate gate for named external resources.
pub struct AdmissionController {
    windows: RwLock<HashMap<String, Arc<Mutex<AdmissionWindow>>>>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl AdmissionController {
    /// Create a controller using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a controller reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            clock,
            poll_interval: DEFAULT_ADMISSION_POLL,
        }
    }

    /// Set the retry interval used by the waiting helpers.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Limit `resource` to `limit` admissions per `window`. Last write wins;
    /// admissions already recorded keep counting against the new limit.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `limit` or `window` is zero.
    pub fn configure(
        &self,
        resource: &str,
        limit: usize,
        window: Duration,
    ) -> Result<(), SchedulerError> {
        if limit == 0 {
            return Err(SchedulerError::InvalidConfig(format!(
                "resource `{resource}`: limit must be greater than 0"
            )));
        }
        if window.is_zero() {
            return Err(SchedulerError::InvalidConfig(format!(
                "resource `{resource}`: window must be greater than 0"
            )));
        }

        self.windows
            .write()
            .entry(resource.to_string())
            .and_modify(|existing| existing.lock().reconfigure(limit, window))
            .or_insert_with(|| Arc::new(Mutex::new(AdmissionWindow::new(limit, window))));

        debug!(resource, limit, window = ?window, "admission window configured");
        Ok(())
    }

    /// Remove the limit for `resource`, making it unlimited again.
    pub fn remove(&self, resource: &str) -> bool {
        self.windows.write().remove(resource).is_some()
    }

    /// True if `resource` has a configured limit.
    #[must_use]
    pub fn is_configured(&self, resource: &str) -> bool {
        self.windows.read().contains_key(resource)
    }

    fn window(&self, resource: &str) -> Option<Arc<Mutex<AdmissionWindow>>> {
        self.windows.read().get(resource).cloned()
    }

    /// Admit one call to `resource` at `now` if its window has room.
    ///
    /// Denial is a normal outcome and leaves the window unchanged.
    pub fn try_admit(&self, resource: &str, now: Timestamp) -> bool {
        let Some(window) = self.window(resource) else {
            return true;
        };
        let admitted = window.lock().try_admit(now);
        if !admitted {
            debug!(resource, "admission denied");
        }
        admitted
    }

    /// [`Self::try_admit`] at the controller clock's current time.
    pub fn try_admit_now(&self, resource: &str) -> bool {
        self.try_admit(resource, self.clock.now())
    }

    /// How long until `resource` could admit again; `None` if it can now.
    pub fn retry_after(&self, resource: &str, now: Timestamp) -> Option<Duration> {
        self.window(resource)
            .and_then(|window| window.lock().retry_after(now))
    }

    /// Current usage of `resource`, if configured.
    pub fn snapshot(&self, resource: &str) -> Option<AdmissionSnapshot> {
        let window = self.window(resource)?;
        let mut window = window.lock();
        window.prune(self.clock.now());
        Some(AdmissionSnapshot {
            limit: window.limit(),
            window: window.window(),
            in_window: window.len(),
        })
    }

    /// Wait until `resource` admits a call.
    ///
    /// Retries at most every poll interval, so the wait can overshoot the
    /// moment capacity frees up by up to one interval. Competing waiters are
    /// not served in arrival order.
    pub async fn wait_and_admit(&self, resource: &str) {
        loop {
            let now = self.clock.now();
            if self.try_admit(resource, now) {
                return;
            }
            let delay = self
                .retry_after(resource, now)
                .map_or(self.poll_interval, |d| d.min(self.poll_interval));
            tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
        }
    }

    /// Run `f` if `resource` admits a call right now.
    ///
    /// # Errors
    ///
    /// `RateLimitExceeded` if the window is full; `f` is not called.
    pub async fn execute<F, Fut, T>(&self, resource: &str, f: F) -> Result<T, SchedulerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.try_admit_now(resource) {
            Ok(f().await)
        } else {
            Err(SchedulerError::RateLimitExceeded(resource.to_string()))
        }
    }

    /// Wait for admission to `resource`, then run `f`.
    pub async fn wait_and_execute<F, Fut, T>(&self, resource: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.wait_and_admit(resource).await;
        f().await
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}
