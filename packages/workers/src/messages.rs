//! Message types for worker actors.

use ractor::RpcReplyPort;

/// Messages for a `WorkerActor`.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Look for pending work.
    Poll,

    /// Liveness tick; refreshes the worker's status record.
    Heartbeat,

    /// A spawned batch finished.
    BatchDone {
        jobs: usize,
        terminal_failures: usize,
        last_error: Option<String>,
    },

    /// Check if the worker has no batch in flight.
    IsIdle { reply: RpcReplyPort<bool> },

    /// Stop, letting any in-flight batch finish first.
    Shutdown,
}
