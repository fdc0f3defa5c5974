//! Error types for runtime components.

use std::time::Duration;

use thiserror::Error;

/// Logical memory violations raised by [`crate::core::MemoryPool`].
///
/// One error kind covers the whole family (bounds, ownership, duplicate id,
/// OOM, zero size, unknown region) so the scheduler can trap pool failures
/// uniformly and mark the offending task `FAILED`.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Allocation of zero bytes requested.
    #[error("size must be > 0")]
    ZeroSize,
    /// Allocation would exceed the pool capacity.
    #[error("out of logical memory: need {needed}B, have {free}B free")]
    OutOfMemory {
        /// Bytes requested by the allocation.
        needed: usize,
        /// Bytes currently free in the pool.
        free: usize,
    },
    /// A region with this identifier already exists.
    #[error("region {0:?} already exists")]
    DuplicateRegion(String),
    /// No region with this identifier.
    #[error("unknown region {0:?}")]
    UnknownRegion(String),
    /// Mutation attempted on a read-only region.
    #[error("region {0:?} is read-only")]
    ReadOnly(String),
    /// Requester does not own the region.
    #[error("owner mismatch: region owned by {owner:?}, requested by {requester:?}")]
    OwnerMismatch {
        /// Task that owns the region.
        owner: String,
        /// Task that made the request.
        requester: String,
    },
    /// Access outside the region bounds.
    #[error("out-of-bounds access: offset={offset} length={length} region_size={size}")]
    OutOfBounds {
        /// Requested starting offset.
        offset: usize,
        /// Requested length.
        length: usize,
        /// Size of the region.
        size: usize,
    },
}

/// IPC send/recv failures.
///
/// Context dictates policy: the worker loop treats a 1-second recv timeout
/// as a poll tick, the supervisor treats send failures during shutdown as
/// "worker already gone", and submit/result-emit failures propagate.
#[derive(Debug, Error)]
pub enum IpcError {
    /// The send did not complete within the timeout.
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),
    /// No message arrived within the timeout.
    #[error("recv timed out after {0:?}")]
    RecvTimeout(Duration),
    /// The other end of the queue is gone.
    #[error("queue disconnected")]
    Disconnected,
}

/// Supervisor lifecycle and submission failures.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// `start()` called on a running supervisor.
    #[error("supervisor already started")]
    AlreadyStarted,
    /// The bound configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Operation requires a running supervisor.
    #[error("supervisor not started; call start() first")]
    NotStarted,
    /// An IPC operation failed.
    #[error(transparent)]
    Ipc(#[from] IpcError),
    /// Spawning a worker thread or binding an HTTP listener failed.
    #[error("spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
}
