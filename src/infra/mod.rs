//! Infrastructure adapters: typed IPC queues and HTTP surfaces.

pub mod http;
pub mod ipc;

pub use ipc::{
    message_channel, Message, MessageReceiver, MessageSender, MessageType, DEFAULT_SEND_TIMEOUT,
    QUEUE_CAPACITY,
};
