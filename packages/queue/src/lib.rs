//! The durable indexing queue and its concurrency primitives.
//!
//! Components, leaves first:
//!
//! - `LockManager` - named mutexes backed by the shared store, with
//!   retry-with-backoff acquisition and token-verified release
//! - `AtomicOps` - lock-guarded read-modify-write critical sections,
//!   including ordered multi-key locking
//! - `JobQueue` - enqueue, batched dequeue-with-assignment, completion,
//!   bounded-retry failure handling, statistics, status lookup
//! - `ProgressTracker` - per-job and per-batch progress with ETA
//! - `Documents` - the status side effect on externally-owned document
//!   records

mod atomic;
mod documents;
mod error;
mod job_queue;
mod lock;
mod progress;

pub use atomic::AtomicOps;
pub use documents::{DocumentStatus, Documents};
pub use error::QueueError;
pub use job_queue::{JobQueue, QueueConfig};
pub use lock::{LockManager, LockOptions, LockToken};
pub use progress::{ProgressDetails, ProgressTracker};
