//! Typed message envelope and bounded send/recv with timeouts.
//!
//! Queues are the only shared resource between the supervisor and its
//! workers. Both endpoints are cloneable; the receiver side is MPMC, so a
//! message goes to whichever worker next receives. Every transient
//! (timeout, closure) surfaces as one error kind, [`IpcError`], letting the
//! call site decide whether it is a benign poll tick or fatal.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::IpcError;

/// Bounded capacity of every supervisor/worker queue.
pub const QUEUE_CAPACITY: usize = 1024;

/// Default send timeout for result emission.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Tag discriminating message payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// A task submission payload bound for a scheduler.
    TaskSubmit,
    /// A task outcome bound for the supervisor.
    TaskResult,
    /// Worker lifecycle notification.
    WorkerStatus,
    /// Control directive (shutdown, reserved: reload, pause).
    Control,
}

/// A tagged record pairing a [`MessageType`] with a key-value payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Discriminant tag.
    pub kind: MessageType,
    /// String-keyed payload of JSON-serializable values.
    pub payload: Map<String, Value>,
}

impl Message {
    /// Build a message from a tag and payload.
    #[must_use]
    pub const fn new(kind: MessageType, payload: Map<String, Value>) -> Self {
        Self { kind, payload }
    }

    /// Wrap a submission payload in a `TASK_SUBMIT` envelope.
    #[must_use]
    pub const fn task_submit(payload: Map<String, Value>) -> Self {
        Self::new(MessageType::TaskSubmit, payload)
    }

    /// Build a `CONTROL` message carrying an action keyword.
    #[must_use]
    pub fn control(action: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("action".to_string(), Value::String(action.to_string()));
        Self::new(MessageType::Control, payload)
    }

    /// The `action` field of a `CONTROL` payload, if present.
    #[must_use]
    pub fn control_action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }
}

/// Sending endpoint of a bounded message queue.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: Sender<Message>,
}

/// Receiving endpoint of a bounded message queue.
#[derive(Debug, Clone)]
pub struct MessageReceiver {
    rx: Receiver<Message>,
}

/// Create a bounded queue with [`QUEUE_CAPACITY`] slots.
#[must_use]
pub fn message_channel() -> (MessageSender, MessageReceiver) {
    message_channel_with_capacity(QUEUE_CAPACITY)
}

/// Create a bounded queue with an explicit capacity (must be ≥ 1).
#[must_use]
pub fn message_channel_with_capacity(capacity: usize) -> (MessageSender, MessageReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (MessageSender { tx }, MessageReceiver { rx })
}

impl MessageSender {
    /// Enqueue a message, blocking up to `timeout`.
    ///
    /// # Errors
    ///
    /// [`IpcError::SendTimeout`] if the queue stays full past the timeout;
    /// [`IpcError::Disconnected`] if all receivers are gone.
    pub fn send(&self, msg: Message, timeout: Duration) -> Result<(), IpcError> {
        self.tx.send_timeout(msg, timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => IpcError::SendTimeout(timeout),
            SendTimeoutError::Disconnected(_) => IpcError::Disconnected,
        })
    }
}

impl MessageReceiver {
    /// Dequeue a message, blocking up to `timeout`.
    ///
    /// # Errors
    ///
    /// [`IpcError::RecvTimeout`] if nothing arrives in time;
    /// [`IpcError::Disconnected`] if all senders are gone and the queue is
    /// drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Message, IpcError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => IpcError::RecvTimeout(timeout),
            RecvTimeoutError::Disconnected => IpcError::Disconnected,
        })
    }

    /// Dequeue a message, blocking indefinitely.
    ///
    /// # Errors
    ///
    /// [`IpcError::Disconnected`] if all senders are gone and the queue is
    /// drained.
    pub fn recv(&self) -> Result<Message, IpcError> {
        self.rx.recv().map_err(|_| IpcError::Disconnected)
    }

    /// Number of messages currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(20);

    #[test]
    fn test_roundtrip_every_message_type() {
        let (tx, rx) = message_channel();
        for kind in [
            MessageType::TaskSubmit,
            MessageType::TaskResult,
            MessageType::WorkerStatus,
            MessageType::Control,
        ] {
            tx.send(Message::new(kind, Map::new()), TICK).unwrap();
            let msg = rx.recv_timeout(TICK).unwrap();
            assert_eq!(msg.kind, kind);
        }
    }

    #[test]
    fn test_fifo_order_preserved() {
        let (tx, rx) = message_channel();
        for i in 0..5 {
            let mut payload = Map::new();
            payload.insert("seq".into(), Value::from(i));
            tx.send(Message::new(MessageType::TaskSubmit, payload), TICK)
                .unwrap();
        }
        for i in 0..5 {
            let msg = rx.recv_timeout(TICK).unwrap();
            assert_eq!(msg.payload.get("seq"), Some(&Value::from(i)));
        }
    }

    #[test]
    fn test_recv_timeout_on_empty_queue() {
        let (_tx, rx) = message_channel();
        assert!(matches!(
            rx.recv_timeout(TICK),
            Err(IpcError::RecvTimeout(_))
        ));
    }

    #[test]
    fn test_send_timeout_on_full_queue() {
        let (tx, _rx) = message_channel_with_capacity(1);
        tx.send(Message::control("noop"), TICK).unwrap();
        assert!(matches!(
            tx.send(Message::control("noop"), TICK),
            Err(IpcError::SendTimeout(_))
        ));
    }

    #[test]
    fn test_disconnected_receiver() {
        let (tx, rx) = message_channel();
        drop(rx);
        assert!(matches!(
            tx.send(Message::control("noop"), TICK),
            Err(IpcError::Disconnected)
        ));
    }

    #[test]
    fn test_disconnected_sender_after_drain() {
        let (tx, rx) = message_channel();
        tx.send(Message::control("last"), TICK).unwrap();
        drop(tx);
        assert!(rx.recv().is_ok());
        assert!(matches!(rx.recv(), Err(IpcError::Disconnected)));
    }

    #[test]
    fn test_control_action_accessor() {
        let msg = Message::control("shutdown");
        assert_eq!(msg.control_action(), Some("shutdown"));
        assert_eq!(Message::new(MessageType::Control, Map::new()).control_action(), None);
    }
}
