//! Cooperative priority scheduler for one worker.
//!
//! Scheduling policy:
//! - Tasks in `PENDING` or `WAITING` state are eligible.
//! - Among eligible tasks, the one with the highest priority runs; ties are
//!   broken by earliest creation time.
//! - Each call to [`Scheduler::run_once`] executes one quantum for one task.
//!
//! Deadline enforcement: a task whose deadline has passed at selection time
//! moves straight to `CANCELLED` and its result is emitted; the step hook
//! never runs for it.
//!
//! Failure semantics: per-task errors are converted to `FAILED` and never
//! tear down the scheduler. Result-queue send failures are fatal to the
//! current step and propagate to the worker loop.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::core::error::IpcError;
use crate::core::memory::MemoryPool;
use crate::core::metrics::MetricsRegistry;
use crate::core::task::{Task, TaskState};
use crate::infra::ipc::{Message, MessageSender, MessageType, DEFAULT_SEND_TIMEOUT};
use crate::util::clock::now_ms;

/// Extension hook advancing one quantum of a task.
///
/// Supplied at scheduler construction; the default [`NoopStep`] makes one
/// step equal completion. Domain interpreters that need multiple quanta set
/// the task to `WAITING` inside [`StepHook::execute_step`] and are
/// re-selected on a later `run_once`.
pub trait StepHook: Send {
    /// Advance one quantum of `task`, mutating its state as appropriate.
    ///
    /// The worker's memory pool is available for region allocation. Any
    /// error marks the task `FAILED` with the error's display string
    /// recorded in `last_error`.
    ///
    /// # Errors
    ///
    /// Domain-specific step failures, including [`crate::core::MemoryError`]
    /// via `?`.
    fn execute_step(&mut self, task: &mut Task, memory: &mut MemoryPool) -> anyhow::Result<()>;

    /// Completion predicate; `true` unless the task parked itself.
    fn is_task_complete(&self, task: &Task) -> bool {
        task.state != TaskState::Waiting
    }
}

/// Default hook: no work, so a single step completes the task.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStep;

impl StepHook for NoopStep {
    fn execute_step(&mut self, _task: &mut Task, _memory: &mut MemoryPool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Cooperative priority scheduler with deadline enforcement, quantum
/// accounting, and result emission.
pub struct Scheduler {
    tasks: Vec<Task>,
    result_tx: MessageSender,
    quantum_ms: u64,
    memory: MemoryPool,
    metrics: Arc<MetricsRegistry>,
    hook: Box<dyn StepHook>,
}

impl Scheduler {
    /// Create a scheduler with the default single-step hook.
    #[must_use]
    pub fn new(result_tx: MessageSender, quantum_ms: u64, memory_pool_bytes: usize) -> Self {
        Self::with_hook(result_tx, quantum_ms, memory_pool_bytes, Box::new(NoopStep))
    }

    /// Create a scheduler with a custom execute-step hook.
    #[must_use]
    pub fn with_hook(
        result_tx: MessageSender,
        quantum_ms: u64,
        memory_pool_bytes: usize,
        hook: Box<dyn StepHook>,
    ) -> Self {
        Self {
            tasks: Vec::new(),
            result_tx,
            quantum_ms,
            memory: MemoryPool::new(memory_pool_bytes),
            metrics: Arc::new(MetricsRegistry::new()),
            hook,
        }
    }

    /// Build a `PENDING` task from an IPC payload and append it.
    pub fn enqueue_from_payload(&mut self, payload: Map<String, Value>) {
        let task = Task::from_submit_payload(payload);
        debug!(task_id = %task.meta.id, priority = task.meta.priority, "task enqueued");
        self.tasks.push(task);
        self.metrics.tasks_submitted.inc();
        self.metrics.worker_queue_depth.set(self.tasks.len() as f64);
    }

    /// Pick the highest-priority eligible task and execute one quantum.
    ///
    /// A no-op if nothing is eligible.
    ///
    /// # Errors
    ///
    /// [`IpcError`] only when result emission fails; per-task failures are
    /// absorbed into the task's state.
    pub fn run_once(&mut self) -> Result<(), IpcError> {
        let Some(idx) = self.select_ready() else {
            return Ok(());
        };

        // Deadline check happens before any step execution.
        let task = &mut self.tasks[idx];
        if let Some(deadline_ms) = task.meta.deadline_ms {
            if now_ms() > deadline_ms {
                task.state = TaskState::Cancelled;
                warn!(task_id = %task.meta.id, "task deadline exceeded");
                self.metrics.tasks_cancelled.inc();
                let task = self.tasks.remove(idx);
                self.memory.release_owned(&task.meta.id);
                let emitted = self.emit_result(&task);
                self.refresh_gauges();
                return emitted;
            }
        }

        self.run_task_quantum(idx)
    }

    /// Number of tasks currently held by the scheduler.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// This scheduler's metric registry.
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Read-only view of the scheduler's memory pool.
    #[must_use]
    pub fn memory(&self) -> &MemoryPool {
        &self.memory
    }

    /// Index of the eligible task maximizing `(priority, -created_at)`.
    ///
    /// First-encountered wins on exact ties, so equal tasks run in
    /// submission order.
    fn select_ready(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, task) in self.tasks.iter().enumerate() {
            if !task.state.is_ready() {
                continue;
            }
            match best {
                None => best = Some(i),
                Some(b) => {
                    let cur = &self.tasks[b];
                    if (task.meta.priority, Reverse(task.meta.created_at_ms))
                        > (cur.meta.priority, Reverse(cur.meta.created_at_ms))
                    {
                        best = Some(i);
                    }
                }
            }
        }
        best
    }

    fn run_task_quantum(&mut self, idx: usize) -> Result<(), IpcError> {
        let start = Instant::now();
        let task_id = self.tasks[idx].meta.id.clone();
        self.tasks[idx].state = TaskState::Running;

        let step_result = self.hook.execute_step(&mut self.tasks[idx], &mut self.memory);

        let finished = match step_result {
            Err(err) => {
                let task = &mut self.tasks[idx];
                task.state = TaskState::Failed;
                task.last_error = Some(err.to_string());
                error!(task_id = %task.meta.id, error = %err, "task failed");
                self.metrics.tasks_failed.inc();
                true
            }
            Ok(()) => {
                if self.hook.is_task_complete(&self.tasks[idx]) {
                    self.tasks[idx].state = TaskState::Done;
                    self.metrics.tasks_completed.inc();
                    true
                } else {
                    // Not complete: state stays RUNNING unless the hook
                    // parked the task in WAITING.
                    false
                }
            }
        };

        let emitted = if finished {
            let task = self.tasks.remove(idx);
            self.memory.release_owned(&task.meta.id);
            self.emit_result(&task)
        } else {
            Ok(())
        };

        // Quantum accounting and gauge refresh run on every path, even when
        // emission failed.
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > self.quantum_ms {
            self.metrics.scheduler_quantum_overruns.inc();
            warn!(
                task_id = %task_id,
                elapsed_ms,
                quantum_ms = self.quantum_ms,
                "quantum overrun"
            );
        }
        self.refresh_gauges();

        emitted
    }

    /// Emit the task's `TASK_RESULT` message. At most once per task: the
    /// caller removes the task from the list in the same step.
    fn emit_result(&self, task: &Task) -> Result<(), IpcError> {
        let mut payload = Map::new();
        payload.insert("id".to_string(), Value::String(task.meta.id.clone()));
        payload.insert("owner".to_string(), Value::String(task.meta.owner.clone()));
        payload.insert(
            "state".to_string(),
            Value::String(task.state.name().to_string()),
        );
        payload.insert(
            "last_error".to_string(),
            task.last_error
                .as_ref()
                .map_or(Value::Null, |e| Value::String(e.clone())),
        );
        self.result_tx
            .send(Message::new(MessageType::TaskResult, payload), DEFAULT_SEND_TIMEOUT)
    }

    fn refresh_gauges(&self) {
        self.metrics.worker_queue_depth.set(self.tasks.len() as f64);
        self.metrics
            .memory_used_bytes
            .set(self.memory.used_bytes() as f64);
        self.metrics
            .memory_region_count
            .set(self.memory.region_count() as f64);
    }

}
