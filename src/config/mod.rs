//! Configuration models for the scheduler, worker pool and resource limits.

pub mod pool;
pub mod scheduler;

pub use pool::WorkerPoolConfig;
pub use scheduler::{ResourceLimitConfig, SchedulerConfig};
