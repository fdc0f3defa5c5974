//! Core execution substrate: tasks, scheduler, memory pool, metrics, errors.

pub mod error;
pub mod memory;
pub mod metrics;
pub mod scheduler;
pub mod task;

pub use error::{IpcError, MemoryError, SupervisorError};
pub use memory::{MemoryPool, Region};
pub use metrics::{Counter, Gauge, MetricsRegistry, EXPOSITION_CONTENT_TYPE};
pub use scheduler::{NoopStep, Scheduler, StepHook};
pub use task::{Task, TaskMetadata, TaskState};
