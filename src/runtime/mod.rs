//! Runtime adapters for spawning the scheduler loop.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
