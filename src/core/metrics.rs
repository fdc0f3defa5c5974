//! Process-local counters and gauges with Prometheus text exposition.
//!
//! Metric names are stable; they form part of the external exposition
//! contract. Each metric guards its value with its own mutex so foreground
//! work and the exposition HTTP handler can touch the registry
//! concurrently without a registry-wide lock.
//!
//! Registries are instances, shared as `Arc<MetricsRegistry>`: every worker
//! owns one (its scheduler's view) and the supervisor owns the one its
//! `/metrics` surface exposes. Worker and supervisor state stay
//! independent.

use parking_lot::Mutex;

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Monotonically increasing counter.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    help: &'static str,
    value: Mutex<f64>,
}

impl Counter {
    fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            value: Mutex::new(0.0),
        }
    }

    /// Increment by one.
    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    /// Increment by `amount`.
    pub fn inc_by(&self, amount: f64) {
        *self.value.lock() += amount;
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> f64 {
        *self.value.lock()
    }

    /// Three-line exposition block (`# HELP`, `# TYPE`, sample).
    #[must_use]
    pub fn exposition(&self) -> String {
        format!(
            "# HELP {name} {help}\n# TYPE {name} counter\n{name}_total {value}\n",
            name = self.name,
            help = self.help,
            value = self.value()
        )
    }
}

/// Arbitrarily settable gauge.
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    help: &'static str,
    value: Mutex<f64>,
}

impl Gauge {
    fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            value: Mutex::new(0.0),
        }
    }

    /// Set to `value`.
    pub fn set(&self, value: f64) {
        *self.value.lock() = value;
    }

    /// Increment by one.
    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    /// Increment by `amount`.
    pub fn inc_by(&self, amount: f64) {
        *self.value.lock() += amount;
    }

    /// Decrement by one.
    pub fn dec(&self) {
        self.dec_by(1.0);
    }

    /// Decrement by `amount`.
    pub fn dec_by(&self, amount: f64) {
        *self.value.lock() -= amount;
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> f64 {
        *self.value.lock()
    }

    /// Three-line exposition block (`# HELP`, `# TYPE`, sample).
    #[must_use]
    pub fn exposition(&self) -> String {
        format!(
            "# HELP {name} {help}\n# TYPE {name} gauge\n{name} {value}\n",
            name = self.name,
            help = self.help,
            value = self.value()
        )
    }
}

/// All metrics of one process-level component (a worker or the supervisor).
#[derive(Debug)]
pub struct MetricsRegistry {
    /// Increments on every submit reaching this component.
    pub tasks_submitted: Counter,
    /// Increments when a task reaches `DONE`.
    pub tasks_completed: Counter,
    /// Increments when a task reaches `FAILED`.
    pub tasks_failed: Counter,
    /// Increments when a task reaches `CANCELLED`.
    pub tasks_cancelled: Counter,
    /// Increments when a step's wall time exceeds the quantum budget.
    pub scheduler_quantum_overruns: Counter,
    /// Set after each step from the pool's used bytes.
    pub memory_used_bytes: Gauge,
    /// Set after each step from the pool's region count.
    pub memory_region_count: Gauge,
    /// Set on enqueue and after each step from the task-list length.
    pub worker_queue_depth: Gauge,
}

impl MetricsRegistry {
    /// Create a registry with all metrics at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks_submitted: Counter::new(
                "monolith_tasks_submitted",
                "Total tasks submitted to this worker",
            ),
            tasks_completed: Counter::new(
                "monolith_tasks_completed",
                "Total tasks completed successfully",
            ),
            tasks_failed: Counter::new(
                "monolith_tasks_failed",
                "Total tasks that ended in FAILED state",
            ),
            tasks_cancelled: Counter::new("monolith_tasks_cancelled", "Total tasks cancelled"),
            scheduler_quantum_overruns: Counter::new(
                "monolith_scheduler_quantum_overruns",
                "Number of task quanta that exceeded quantum_ms",
            ),
            memory_used_bytes: Gauge::new(
                "monolith_memory_used_bytes",
                "Current logical memory pool usage in bytes",
            ),
            memory_region_count: Gauge::new(
                "monolith_memory_region_count",
                "Number of active logical memory regions",
            ),
            worker_queue_depth: Gauge::new(
                "monolith_worker_queue_depth",
                "Current number of tasks in the worker's run queue",
            ),
        }
    }

    /// Full exposition text: per-metric blocks separated by blank lines.
    #[must_use]
    pub fn exposition_text(&self) -> String {
        [
            self.tasks_submitted.exposition(),
            self.tasks_completed.exposition(),
            self.tasks_failed.exposition(),
            self.tasks_cancelled.exposition(),
            self.scheduler_quantum_overruns.exposition(),
            self.memory_used_bytes.exposition(),
            self.memory_region_count.exposition(),
            self.worker_queue_depth.exposition(),
        ]
        .join("\n")
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_monotonic() {
        let c = Counter::new("test_counter", "help");
        assert_eq!(c.value(), 0.0);
        c.inc();
        c.inc_by(2.5);
        assert_eq!(c.value(), 3.5);
    }

    #[test]
    fn test_gauge_set_inc_dec() {
        let g = Gauge::new("test_gauge", "help");
        g.set(10.0);
        g.inc_by(5.0);
        g.dec_by(3.0);
        assert_eq!(g.value(), 12.0);
    }

    #[test]
    fn test_counter_exposition_has_total_suffix() {
        let c = Counter::new("monolith_tasks_submitted", "Total tasks submitted to this worker");
        c.inc();
        let text = c.exposition();
        assert!(text.contains("# HELP monolith_tasks_submitted Total tasks submitted to this worker\n"));
        assert!(text.contains("# TYPE monolith_tasks_submitted counter\n"));
        assert!(text.contains("monolith_tasks_submitted_total 1\n"));
    }

    #[test]
    fn test_gauge_exposition_has_no_suffix() {
        let g = Gauge::new("monolith_memory_used_bytes", "usage");
        g.set(64.0);
        let text = g.exposition();
        assert!(text.contains("# TYPE monolith_memory_used_bytes gauge\n"));
        assert!(text.contains("monolith_memory_used_bytes 64\n"));
        assert!(!text.contains("_total"));
    }

    #[test]
    fn test_registry_exposition_lists_all_contract_metrics() {
        let registry = MetricsRegistry::new();
        let text = registry.exposition_text();
        for name in [
            "monolith_tasks_submitted",
            "monolith_tasks_completed",
            "monolith_tasks_failed",
            "monolith_tasks_cancelled",
            "monolith_scheduler_quantum_overruns",
            "monolith_memory_used_bytes",
            "monolith_memory_region_count",
            "monolith_worker_queue_depth",
        ] {
            assert!(text.contains(&format!("# TYPE {name} ")), "missing {name}");
        }
        // blocks separated by blank lines
        assert!(text.contains("\n\n"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        a.tasks_submitted.inc();
        assert_eq!(a.tasks_submitted.value(), 1.0);
        assert_eq!(b.tasks_submitted.value(), 0.0);
    }
}
