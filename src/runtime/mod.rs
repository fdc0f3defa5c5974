//! Supervisor and worker process model.

pub mod supervisor;
pub mod worker;

pub use supervisor::{ScopedSupervisor, Supervisor, DEFAULT_STOP_TIMEOUT};
pub use worker::worker_main;
