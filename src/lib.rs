//! # Monolith
//!
//! A supervisor/worker task-execution runtime.
//!
//! A long-lived [`runtime::Supervisor`] manages a pool of isolated workers,
//! each hosting a cooperative priority [`core::Scheduler`] that executes
//! submitted tasks under a per-worker logical [`core::MemoryPool`]. The
//! supervisor and its workers exchange typed [`infra::ipc::Message`]s over
//! two bounded queues, and a pull-based observability surface exposes
//! health and Prometheus-style metrics over HTTP.
//!
//! ## Architecture
//!
//! - **Across workers**: parallel, isolated execution. Each worker builds
//!   its scheduler, memory pool, and metric registry inside its own thread;
//!   the only coupling between supervisor and workers is the task queue and
//!   the result queue.
//! - **Within a worker**: single-threaded cooperative scheduling. Tasks
//!   yield by returning from the step hook or by parking themselves in
//!   `WAITING`; the scheduler never preempts.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use monolith::config::MonolithConfig;
//! use monolith::runtime::Supervisor;
//! use serde_json::json;
//!
//! let cfg = MonolithConfig { num_workers: 2, metrics_port: 0, health_port: 0, ..MonolithConfig::default() };
//! let mut sup = Supervisor::new(cfg);
//! sup.start().unwrap();
//! sup.submit_task(json!({"meta": {"owner": "demo", "priority": 5}, "op": "noop"})
//!     .as_object().cloned().unwrap()).unwrap();
//! let results = sup.collect_results(std::time::Duration::from_millis(500), 10);
//! sup.stop(std::time::Duration::from_secs(5));
//! # drop(results);
//! ```
//!
//! For complete examples, see `tests/end_to_end.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core execution substrate: tasks, scheduler, memory pool, metrics, errors.
pub mod core;
/// Environment-driven runtime configuration.
pub mod config;
/// Infrastructure adapters: typed IPC queues and HTTP surfaces.
pub mod infra;
/// Supervisor and worker process model.
pub mod runtime;
/// Shared utilities: clock and telemetry.
pub mod util;
