//! Worker loop: blocks on the task queue and drives one scheduler.
//!
//! Each worker owns its scheduler and memory pool exclusively; workers
//! never share state with each other. The loop polls the task queue with a
//! 1-second timeout and runs the scheduler on every tick, which guarantees
//! forward progress for multi-step tasks even when no new submissions
//! arrive.

use std::thread;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::MonolithConfig;
use crate::core::error::IpcError;
use crate::core::scheduler::Scheduler;
use crate::infra::ipc::{Message, MessageReceiver, MessageSender, MessageType};

/// Task-queue poll interval.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timeout for best-effort worker status notifications.
const STATUS_SEND_TIMEOUT: Duration = Duration::from_millis(100);

/// Entry point for one worker.
///
/// Runs until a `CONTROL {action: "shutdown"}` message arrives, the task
/// queue disconnects, or result emission fails unrecoverably.
///
/// Logging is installed once per process by the embedding supervisor;
/// `worker_main` never touches the global subscriber.
pub fn worker_main(task_rx: MessageReceiver, result_tx: MessageSender, config: MonolithConfig) {
    let mut scheduler = Scheduler::new(
        result_tx.clone(),
        config.quantum_ms,
        config.memory_pool_bytes,
    );

    info!("worker started");
    send_status(&result_tx, "started");

    loop {
        match task_rx.recv_timeout(POLL_INTERVAL) {
            Err(IpcError::RecvTimeout(_)) => {
                // Poll tick: run the scheduler even without new submissions.
                if run_once_or_log(&mut scheduler).is_err() {
                    break;
                }
            }
            Err(_) => {
                info!("task queue disconnected; worker exiting");
                break;
            }
            Ok(msg) => match msg.kind {
                MessageType::TaskSubmit => {
                    scheduler.enqueue_from_payload(msg.payload);
                    if run_once_or_log(&mut scheduler).is_err() {
                        break;
                    }
                }
                MessageType::Control => {
                    let action = msg.control_action().unwrap_or("").to_string();
                    info!(action = %action, "control message received");
                    if action == "shutdown" {
                        break;
                    }
                    // Reserved: reload, pause.
                }
                other => {
                    warn!(kind = ?other, "unexpected message type");
                    if run_once_or_log(&mut scheduler).is_err() {
                        break;
                    }
                }
            },
        }
    }

    send_status(&result_tx, "stopped");
    info!("worker stopped");
}

fn run_once_or_log(scheduler: &mut Scheduler) -> Result<(), IpcError> {
    scheduler.run_once().map_err(|e| {
        error!(error = %e, "result emission failed; worker exiting");
        e
    })
}

/// Best-effort lifecycle notification on the result queue.
fn send_status(result_tx: &MessageSender, event: &str) {
    let worker = thread::current()
        .name()
        .unwrap_or("monolith-worker")
        .to_string();
    let mut payload = Map::new();
    payload.insert("worker".to_string(), Value::String(worker));
    payload.insert("event".to_string(), Value::String(event.to_string()));
    let _ = result_tx.send(
        Message::new(MessageType::WorkerStatus, payload),
        STATUS_SEND_TIMEOUT,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::ipc::message_channel;
    use crate::util::telemetry::init_telemetry;
    use serde_json::json;

    fn test_config() -> MonolithConfig {
        MonolithConfig {
            num_workers: 1,
            quantum_ms: 10,
            memory_pool_bytes: 1024 * 1024,
            metrics_port: 0,
            health_port: 0,
            ..MonolithConfig::default()
        }
    }

    fn submit_payload(owner: &str) -> Map<String, Value> {
        json!({"meta": {"owner": owner, "priority": 0}, "op": "noop"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_worker_processes_submit_and_shuts_down() {
        // no supervisor here, so the test installs logging itself
        init_telemetry("WARNING");
        let (task_tx, task_rx) = message_channel();
        let (result_tx, result_rx) = message_channel();
        let handle = thread::Builder::new()
            .name("monolith-worker-test".to_string())
            .spawn(move || worker_main(task_rx, result_tx, test_config()))
            .unwrap();

        let tick = Duration::from_millis(100);
        task_tx
            .send(Message::task_submit(submit_payload("t")), tick)
            .unwrap();

        // drain until the task result shows up (skipping status messages)
        let deadline = std::time::Instant::now() + Duration::from_secs(3);
        let mut result = None;
        while std::time::Instant::now() < deadline && result.is_none() {
            if let Ok(msg) = result_rx.recv_timeout(tick) {
                if msg.kind == MessageType::TaskResult {
                    result = Some(msg);
                }
            }
        }
        let result = result.expect("worker should emit one task result");
        assert_eq!(result.payload.get("state"), Some(&json!("DONE")));

        task_tx.send(Message::control("shutdown"), tick).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_worker_exits_when_task_queue_disconnects() {
        init_telemetry("WARNING");
        let (task_tx, task_rx) = message_channel();
        let (result_tx, _result_rx) = message_channel();
        let handle = thread::spawn(move || worker_main(task_rx, result_tx, test_config()));
        drop(task_tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_worker_ignores_unknown_control_actions() {
        init_telemetry("WARNING");
        let (task_tx, task_rx) = message_channel();
        let (result_tx, _result_rx) = message_channel();
        let handle = thread::spawn(move || worker_main(task_rx, result_tx, test_config()));

        let tick = Duration::from_millis(100);
        task_tx.send(Message::control("reload"), tick).unwrap();
        task_tx.send(Message::control("shutdown"), tick).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_worker_emits_status_messages() {
        init_telemetry("WARNING");
        let (task_tx, task_rx) = message_channel();
        let (result_tx, result_rx) = message_channel();
        let handle = thread::spawn(move || worker_main(task_rx, result_tx, test_config()));

        let tick = Duration::from_millis(500);
        let started = result_rx.recv_timeout(tick).unwrap();
        assert_eq!(started.kind, MessageType::WorkerStatus);
        assert_eq!(started.payload.get("event"), Some(&json!("started")));

        task_tx
            .send(Message::control("shutdown"), tick)
            .unwrap();
        handle.join().unwrap();
        let stopped = result_rx.recv_timeout(tick).unwrap();
        assert_eq!(stopped.payload.get("event"), Some(&json!("stopped")));
    }
}
