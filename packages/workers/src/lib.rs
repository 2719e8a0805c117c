//! Worker actors that drain the indexing queue.
//!
//! Each worker polls for a batch of jobs, runs the chunk-and-persist
//! pipeline for every job in the batch concurrently, and publishes its
//! own entry in the shared worker-status hash.

mod actor;
mod messages;
mod pool;
mod processor;

pub use actor::{WorkerActor, WorkerActorState, WorkerArgs};
pub use messages::WorkerMessage;
pub use pool::{WorkerConfig, WorkerError, WorkerPool};
pub use processor::{IndexProcessor, JobOutcome};
