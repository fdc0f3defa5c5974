//! Supervisor: spawns workers, owns the queues, submits tasks, collects
//! results, and drives shutdown.
//!
//! Workers are dedicated, named threads that construct all of their state
//! (scheduler, memory pool, metric registry) inside the thread body;
//! isolation is by ownership, and the two bounded queues are the only
//! coupling. Shutdown is cooperative: each worker gets one shutdown
//! control message and a share of the stop budget; stragglers are given a
//! 2-second grace and then detached with a warning.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::MonolithConfig;
use crate::core::error::SupervisorError;
use crate::core::metrics::MetricsRegistry;
use crate::infra::http::{self, HealthState, HttpServerHandle, ReadinessCheck};
use crate::infra::ipc::{message_channel, Message, MessageReceiver, MessageSender, MessageType};
use crate::runtime::worker::worker_main;
use crate::util::telemetry::init_telemetry;

/// Default stop budget when none is given (drop paths).
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period granted to a straggling worker after the stop budget.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Send timeout for shutdown control messages.
const SHUTDOWN_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Worker-pool manager and task entry point.
pub struct Supervisor {
    cfg: MonolithConfig,
    task_tx: MessageSender,
    task_rx: MessageReceiver,
    result_tx: MessageSender,
    result_rx: MessageReceiver,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    started: Arc<AtomicBool>,
    metrics: Arc<MetricsRegistry>,
    http_servers: Vec<HttpServerHandle>,
}

impl Supervisor {
    /// Bind configuration and create the task and result queues.
    #[must_use]
    pub fn new(cfg: MonolithConfig) -> Self {
        init_telemetry(&cfg.log_level);
        let (task_tx, task_rx) = message_channel();
        let (result_tx, result_rx) = message_channel();
        Self {
            cfg,
            task_tx,
            task_rx,
            result_tx,
            result_rx,
            workers: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(MetricsRegistry::new()),
            http_servers: Vec::new(),
        }
    }

    /// Start a supervisor and wrap it in a guard that stops it on drop.
    ///
    /// # Errors
    ///
    /// [`SupervisorError`] if the supervisor cannot start.
    pub fn scoped(cfg: MonolithConfig) -> Result<ScopedSupervisor, SupervisorError> {
        let mut supervisor = Self::new(cfg);
        supervisor.start()?;
        Ok(ScopedSupervisor { supervisor })
    }

    /// Spawn all workers and start the health and metrics surfaces.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::AlreadyStarted`] on a second call;
    /// [`SupervisorError::InvalidConfig`] if the bound configuration fails
    /// validation; [`SupervisorError::Spawn`] if a listener cannot be bound
    /// or a worker thread cannot be spawned.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(SupervisorError::AlreadyStarted);
        }
        self.cfg.validate().map_err(SupervisorError::InvalidConfig)?;

        if self.cfg.metrics_port != 0 {
            self.http_servers.push(http::serve(
                "monolith-metrics",
                self.cfg.metrics_port,
                http::metrics_router(Arc::clone(&self.metrics)),
            )?);
        }

        for i in 0..self.cfg.num_workers {
            let name = format!("monolith-worker-{i}");
            let task_rx = self.task_rx.clone();
            let result_tx = self.result_tx.clone();
            let cfg = self.cfg.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_main(task_rx, result_tx, cfg))?;
            info!(worker = %name, "worker spawned");
            self.workers.lock().push(handle);
        }

        if self.cfg.health_port != 0 {
            self.http_servers.push(http::serve(
                "monolith-health",
                self.cfg.health_port,
                http::health_router(HealthState::new(self.readiness_check())),
            )?);
        }

        self.started.store(true, Ordering::SeqCst);
        info!(num_workers = self.cfg.num_workers, "supervisor started");
        Ok(())
    }

    /// Send a task to the worker pool.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotStarted`] before `start()`; any [`IpcError`]
    /// from the queue send propagates.
    ///
    /// [`IpcError`]: crate::core::error::IpcError
    pub fn submit_task(&self, payload: Map<String, Value>) -> Result<(), SupervisorError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(SupervisorError::NotStarted);
        }
        self.task_tx
            .send(Message::task_submit(payload), self.cfg.ipc_send_timeout())?;
        self.metrics.tasks_submitted.inc();
        Ok(())
    }

    /// Drain up to `max_results` task results from the result queue.
    ///
    /// Each receive waits up to `timeout`; the drain stops early on the
    /// first timeout or disconnect. Only `TASK_RESULT` payloads are
    /// collected, in receipt order.
    #[must_use]
    pub fn collect_results(&self, timeout: Duration, max_results: usize) -> Vec<Map<String, Value>> {
        let mut results = Vec::new();
        for _ in 0..max_results {
            match self.result_rx.recv_timeout(timeout) {
                Ok(msg) if msg.kind == MessageType::TaskResult => results.push(msg.payload),
                Ok(_) => {} // worker status and other envelopes are skipped
                Err(_) => break,
            }
        }
        results
    }

    /// Gracefully shut down all workers within `timeout`, then stop the
    /// HTTP surfaces.
    ///
    /// Safe to call on a not-started supervisor (no-op).
    pub fn stop(&mut self, timeout: Duration) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }

        let worker_count = self.workers.lock().len();
        for _ in 0..worker_count {
            if let Err(e) = self
                .task_tx
                .send(Message::control("shutdown"), SHUTDOWN_SEND_TIMEOUT)
            {
                // Worker may already be gone.
                debug!(error = %e, "shutdown send failed");
            }
        }

        let deadline = Instant::now() + timeout;
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let name = handle
                .thread()
                .name()
                .unwrap_or("monolith-worker")
                .to_string();
            let remaining = deadline.saturating_duration_since(Instant::now());
            join_with_timeout(handle, remaining, &name);
        }

        for server in self.http_servers.drain(..) {
            server.stop();
        }

        self.started.store(false, Ordering::SeqCst);
        info!("supervisor stopped");
    }

    /// Whether `start()` has completed and `stop()` has not.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// The supervisor-level metric registry (exposed on `/metrics`).
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// True iff the supervisor is started and every worker is alive.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        Self::all_workers_alive(&self.started, &self.workers)
    }

    fn all_workers_alive(started: &AtomicBool, workers: &Mutex<Vec<JoinHandle<()>>>) -> bool {
        started.load(Ordering::SeqCst) && workers.lock().iter().all(|h| !h.is_finished())
    }

    fn readiness_check(&self) -> ReadinessCheck {
        let started = Arc::clone(&self.started);
        let workers = Arc::clone(&self.workers);
        Arc::new(move || Self::all_workers_alive(&started, &workers))
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Backstop so every exit path stops the pool; no-op when already
        // stopped.
        self.stop(DEFAULT_STOP_TIMEOUT);
    }
}

/// Guard returned by [`Supervisor::scoped`]: entering starts, dropping
/// stops.
pub struct ScopedSupervisor {
    supervisor: Supervisor,
}

impl Deref for ScopedSupervisor {
    type Target = Supervisor;

    fn deref(&self) -> &Supervisor {
        &self.supervisor
    }
}

impl DerefMut for ScopedSupervisor {
    fn deref_mut(&mut self) -> &mut Supervisor {
        &mut self.supervisor
    }
}

impl Drop for ScopedSupervisor {
    fn drop(&mut self) {
        self.supervisor.stop(DEFAULT_STOP_TIMEOUT);
    }
}

/// Join a worker within `timeout` plus a grace period; detach stragglers.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration, name: &str) {
    let (tx, rx) = std::sync::mpsc::channel();
    let waiter = thread::spawn(move || {
        let joined = handle.join().is_ok();
        let _ = tx.send(joined);
    });

    let outcome = rx.recv_timeout(timeout).or_else(|_| {
        warn!(worker = %name, "worker did not stop within budget; granting grace period");
        rx.recv_timeout(STOP_GRACE)
    });

    match outcome {
        Ok(true) => {
            let _ = waiter.join();
            debug!(worker = %name, "worker joined");
        }
        Ok(false) => {
            let _ = waiter.join();
            warn!(worker = %name, "worker panicked");
        }
        Err(_) => {
            // Threads cannot be killed; leave the waiter to reap it
            // whenever it finally exits.
            warn!(worker = %name, "worker still running after grace; detaching");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config(num_workers: usize) -> MonolithConfig {
        MonolithConfig {
            num_workers,
            quantum_ms: 10,
            memory_pool_bytes: 1024 * 1024,
            log_level: "WARNING".to_string(),
            metrics_port: 0,
            ipc_send_timeout_secs: 2.0,
            health_port: 0,
        }
    }

    fn submit_payload() -> Map<String, Value> {
        json!({"meta": {"owner": "test", "priority": 0}})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_start_and_stop() {
        let mut sup = Supervisor::new(test_config(2));
        sup.start().unwrap();
        assert!(sup.is_started());
        assert!(sup.is_ready());
        sup.stop(Duration::from_secs(5));
        assert!(!sup.is_started());
        assert!(!sup.is_ready());
    }

    #[test]
    fn test_double_start_fails() {
        let mut sup = Supervisor::new(test_config(1));
        sup.start().unwrap();
        assert!(matches!(sup.start(), Err(SupervisorError::AlreadyStarted)));
        sup.stop(Duration::from_secs(5));
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let mut sup = Supervisor::new(test_config(0));
        let err = sup.start().unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidConfig(_)));
        assert!(err.to_string().contains("num_workers"));
        assert!(!sup.is_started());
    }

    #[test]
    fn test_submit_before_start_fails() {
        let sup = Supervisor::new(test_config(1));
        assert!(matches!(
            sup.submit_task(submit_payload()),
            Err(SupervisorError::NotStarted)
        ));
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut sup = Supervisor::new(test_config(1));
        sup.stop(Duration::from_secs(1));
        assert!(!sup.is_started());
    }

    #[test]
    fn test_collect_returns_empty_when_no_results() {
        let mut sup = Supervisor::new(test_config(1));
        sup.start().unwrap();
        let results = sup.collect_results(Duration::from_millis(50), 10);
        assert!(results.is_empty());
        sup.stop(Duration::from_secs(5));
    }

    #[test]
    fn test_submit_increments_supervisor_counter() {
        let mut sup = Supervisor::new(test_config(1));
        sup.start().unwrap();
        sup.submit_task(submit_payload()).unwrap();
        assert_eq!(sup.metrics().tasks_submitted.value(), 1.0);
        sup.stop(Duration::from_secs(5));
    }
}
