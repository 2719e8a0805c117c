//! Store key namespace shared by every component.

use crate::{DocId, JobId};

/// Pending list: jobs waiting for a worker.
pub const PENDING_QUEUE: &str = "indexing_queue";

/// Processing list: jobs currently owned by a worker.
pub const PROCESSING_QUEUE: &str = "indexing_processing";

/// Permanently-failed record list.
pub const FAILED_LIST: &str = "indexing_failed";

/// Hash of worker_id -> WorkerState.
pub const WORKER_STATUS: &str = "worker_status";

/// Terminal result record for a job (24h TTL).
pub fn result_key(job_id: JobId) -> String {
    format!("indexing_result:{job_id}")
}

/// Ephemeral mutex key for a named resource (default 30s TTL).
pub fn lock_key(resource: &str) -> String {
    format!("lock:{resource}")
}

/// Per-job progress record (1h TTL).
pub fn progress_key(job_id: JobId) -> String {
    format!("progress:{job_id}")
}

/// Per-batch progress record (1h TTL).
pub fn batch_progress_key(job_id: JobId, batch_id: &str) -> String {
    format!("progress:{job_id}:batch:{batch_id}")
}

/// Externally-owned document record the queue updates as a side effect.
pub fn document_key(doc_id: &DocId) -> String {
    format!("document:{doc_id}")
}

/// Hash of chunk index -> persisted chunk for a document.
pub fn chunks_key(doc_id: &DocId) -> String {
    format!("chunks:{doc_id}")
}
