//! Task model: state machine, metadata, and submission parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::util::clock::now_ms;

/// Lifecycle state of a task.
///
/// Legal transitions:
/// `PENDING → RUNNING → {DONE, FAILED, WAITING}`, `WAITING → RUNNING`, and
/// `PENDING → CANCELLED` when the deadline has passed at selection time.
/// `DONE`, `FAILED`, and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Queued, not yet selected.
    Pending,
    /// Currently executing a quantum.
    Running,
    /// Parked by the step hook; eligible for re-selection.
    Waiting,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
    /// Deadline exceeded before execution.
    Cancelled,
}

impl TaskState {
    /// Wire name of the state, as carried in result payloads.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether the task is eligible for selection.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Pending | Self::Waiting)
    }
}

/// Metadata describing a submitted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Globally unique identifier, generated at construction.
    pub id: String,
    /// Tenant/principal that submitted the task.
    pub owner: String,
    /// Scheduling priority; higher value = higher urgency.
    pub priority: i32,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u64,
    /// Optional absolute deadline in milliseconds since epoch.
    pub deadline_ms: Option<u64>,
    /// Free-form string labels.
    pub labels: HashMap<String, String>,
    /// Resource hints, opaque to the scheduler.
    pub resource_hints: Map<String, Value>,
}

impl TaskMetadata {
    fn with_defaults() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: "system".to_string(),
            priority: 0,
            created_at_ms: now_ms(),
            deadline_ms: None,
            labels: HashMap::new(),
            resource_hints: Map::new(),
        }
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone)]
pub struct Task {
    /// Metadata driving scheduling decisions.
    pub meta: TaskMetadata,
    /// Full submitted payload, opaque to the scheduler.
    pub payload: Map<String, Value>,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Most recent error message, set when the task fails.
    pub last_error: Option<String>,
}

impl Task {
    /// Build a `PENDING` task from an incoming submission payload.
    ///
    /// The optional `meta` sub-object contributes metadata through the
    /// recognized keys `owner`, `priority`, `deadline` (epoch seconds),
    /// `labels`, and `resource_hints`; unrecognized keys are ignored. The
    /// full payload, `meta` block included, is retained so the step hook
    /// has complete context.
    #[must_use]
    pub fn from_submit_payload(payload: Map<String, Value>) -> Self {
        let mut meta = TaskMetadata::with_defaults();

        if let Some(meta_obj) = payload.get("meta").and_then(Value::as_object) {
            if let Some(owner) = meta_obj.get("owner").and_then(Value::as_str) {
                meta.owner = owner.to_string();
            }
            if let Some(priority) = meta_obj.get("priority").and_then(Value::as_i64) {
                meta.priority = priority.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
            }
            if let Some(deadline_secs) = meta_obj.get("deadline").and_then(Value::as_f64) {
                meta.deadline_ms = Some((deadline_secs * 1000.0).max(0.0) as u64);
            }
            if let Some(labels) = meta_obj.get("labels").and_then(Value::as_object) {
                meta.labels = labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect();
            }
            if let Some(hints) = meta_obj.get("resource_hints").and_then(Value::as_object) {
                meta.resource_hints = hints.clone();
            }
        }

        Self {
            meta,
            payload,
            state: TaskState::Pending,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object literal")
    }

    #[test]
    fn test_defaults_without_meta() {
        let t = Task::from_submit_payload(obj(json!({"op": "noop"})));
        assert_eq!(t.state, TaskState::Pending);
        assert_eq!(t.meta.owner, "system");
        assert_eq!(t.meta.priority, 0);
        assert!(t.meta.deadline_ms.is_none());
        assert!(t.meta.labels.is_empty());
        assert!(t.last_error.is_none());
    }

    #[test]
    fn test_meta_keys_recognized() {
        let t = Task::from_submit_payload(obj(json!({
            "meta": {
                "owner": "tenant-1",
                "priority": 42,
                "deadline": 1700000000.5,
                "labels": {"team": "infra"},
                "resource_hints": {"gpu": 1},
                "unknown_key": "ignored"
            },
            "op": "compile"
        })));
        assert_eq!(t.meta.owner, "tenant-1");
        assert_eq!(t.meta.priority, 42);
        assert_eq!(t.meta.deadline_ms, Some(1_700_000_000_500));
        assert_eq!(t.meta.labels.get("team").map(String::as_str), Some("infra"));
        assert_eq!(t.meta.resource_hints.get("gpu"), Some(&json!(1)));
    }

    #[test]
    fn test_full_payload_retained() {
        let payload = obj(json!({"meta": {"owner": "t"}, "op": "x", "args": [1, 2]}));
        let t = Task::from_submit_payload(payload.clone());
        assert_eq!(t.payload, payload);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Task::from_submit_payload(Map::new());
        let b = Task::from_submit_payload(Map::new());
        assert_ne!(a.meta.id, b.meta.id);
    }

    #[test]
    fn test_priority_clamped_to_i32() {
        let t = Task::from_submit_payload(obj(json!({"meta": {"priority": i64::MAX}})));
        assert_eq!(t.meta.priority, i32::MAX);
    }

    #[test]
    fn test_state_names_and_terminality() {
        assert_eq!(TaskState::Done.name(), "DONE");
        assert_eq!(TaskState::Cancelled.name(), "CANCELLED");
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Waiting.is_terminal());
        assert!(TaskState::Pending.is_ready());
        assert!(TaskState::Waiting.is_ready());
        assert!(!TaskState::Running.is_ready());
    }
}
