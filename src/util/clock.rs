//! Time sources for scheduling decisions.
//!
//! Scheduling uses monotonic [`Timestamp`]s supplied by a [`Clock`]. Audit
//! records use wall-clock milliseconds from [`now_ms`].

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Monotonic instant used for due times and admission windows.
pub type Timestamp = tokio::time::Instant;

/// Source of monotonic "now".
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic time.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the tokio time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Starts at the instant it was created and only moves when
/// [`ManualClock::advance`] is called. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Timestamp,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Timestamp::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.origin + *self.offset.lock()
    }
}

/// Wall-clock milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - t0, Duration::from_secs(5));
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(other.now(), clock.now());
    }

    #[test]
    fn now_ms_is_after_epoch() {
        assert!(now_ms() > 0);
    }
}
