//! Core domain types for the document-indexing job queue.
//!
//! This crate contains shared types used across all packages:
//! - IndexJob and its lifecycle states
//! - Worker state records for liveness/ops visibility
//! - Progress and batch-progress records
//! - The store key namespace
//! - The document chunking algorithm

pub mod chunker;
pub mod keys;
mod job;
mod progress;
mod worker;

pub use chunker::{Chunk, chunk_text};
pub use job::{
    DocId, DocumentMeta, IndexJob, IndexResult, JobId, JobSpec, JobState, MAX_ATTEMPTS, Priority,
    QueueStats, TerminalRecord,
};
pub use progress::{BatchProgress, ProgressStatus, ProgressUpdate};
pub use worker::{WorkerState, WorkerStatus};
