//! Infrastructure adapters for the scheduler's pluggable components.

pub mod queue;
pub use queue::InMemoryQueue;
