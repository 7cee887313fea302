//! # Prometheus Scheduler
//!
//! A task scheduling and admission-control engine.
//!
//! The scheduler accepts units of work, one-off or recurring, orders them by
//! due time and priority, and dispatches them to a bounded pool of dedicated
//! worker threads. Tasks that call a rate-limited external resource are gated
//! through a per-resource sliding-window admission controller; a task denied
//! admission is pushed back and retried instead of failing.
//!
//! ## Key Features
//!
//! - **Ordered dispatch**: earliest due first, then priority, then FIFO
//! - **Admission control**: at most `limit` calls per rolling `window` per resource
//! - **Recurrence**: fixed-interval tasks with catch-up, and run-once-at tasks
//! - **Worker threads**: payloads run on OS threads with private runtimes, so
//!   blocking work never stalls the coordination loop
//! - **Outcomes as events**: payload errors and panics become `Failed`
//!   outcomes delivered to completion hooks
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_scheduler::builders::SchedulerBuilder;
//! use prometheus_scheduler::config::SchedulerConfig;
//! use prometheus_scheduler::core::{Recurrence, TaskDescriptor};
//! use prometheus_scheduler::runtime::TokioSpawner;
//!
//! let config = SchedulerConfig::default().with_resource("gpt", 60, 60);
//! let scheduler = SchedulerBuilder::new(config).build(TokioSpawner::current()?)?;
//! let mut events = scheduler.subscribe();
//! scheduler.start()?;
//!
//! scheduler.submit(
//!     TaskDescriptor::from_fn(|ctx| async move { Ok(serde_json::json!({ "run": ctx.run })) })
//!         .with_name("daily-digest")
//!         .with_resource("gpt")
//!         .with_recurrence(Recurrence::FixedInterval(Duration::from_secs(3600))),
//! )?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{} -> {:?}", event.task_id, event.outcome);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Configuration models for the scheduler and worker pool.
pub mod config;
/// Core scheduling abstractions.
pub mod core;
/// Infrastructure adapters (queue backends).
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
