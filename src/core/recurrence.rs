//! Recurrence rules and next-run computation.

use std::time::Duration;

use crate::core::error::SchedulerError;
use crate::core::task::Start;
use crate::util::clock::Timestamp;

/// Rule deciding whether and when a task runs again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Recurrence {
    /// Run once, then finish.
    #[default]
    None,
    /// Run every `Duration`, measured from the previous dispatch.
    FixedInterval(Duration),
    /// Run once at the given instant.
    RunOnceAt(Timestamp),
}

impl Recurrence {
    /// True when the rule can produce further runs after the first.
    #[must_use]
    pub const fn is_recurring(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Reject malformed rules before a task is accepted.
    ///
    /// # Errors
    ///
    /// `InvalidRecurrence` for a zero interval, an interval that runs past
    /// the clock's range from `now`, or a run-once rule paired with an
    /// explicit start (the rule already fixes the due time).
    pub fn validate(&self, start: Start, now: Timestamp) -> Result<(), SchedulerError> {
        match self {
            Self::FixedInterval(interval) if interval.is_zero() => Err(
                SchedulerError::InvalidRecurrence("interval must be greater than zero".into()),
            ),
            Self::FixedInterval(interval) if now.checked_add(*interval).is_none() => Err(
                SchedulerError::InvalidRecurrence("interval is out of range".into()),
            ),
            Self::RunOnceAt(_) if start != Start::Immediately => {
                Err(SchedulerError::InvalidRecurrence(
                    "run-once tasks take their due time from the rule, not a start".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// First due time for a newly submitted task. `None` if the start delay
    /// runs past the clock's range.
    #[must_use]
    pub fn initial_due(&self, start: Start, now: Timestamp) -> Option<Timestamp> {
        match self {
            Self::RunOnceAt(at) => Some(*at),
            _ => start.resolve(now),
        }
    }
}

/// Compute when a task should run next, given when it last ran.
///
/// `FixedInterval` catches up with a single immediate run after a long pause
/// instead of replaying every missed interval. A next run past the clock's
/// range retires the task.
#[must_use]
pub fn next_run(
    recurrence: &Recurrence,
    last_run_at: Option<Timestamp>,
    now: Timestamp,
) -> Option<Timestamp> {
    match recurrence {
        Recurrence::None => None,
        Recurrence::FixedInterval(interval) => {
            let Some(last) = last_run_at else {
                return Some(now);
            };
            let next = last.checked_add(*interval)?;
            Some(if next > now { next } else { now })
        }
        Recurrence::RunOnceAt(at) => (last_run_at.is_none() && *at > now).then_some(*at),
    }
}
