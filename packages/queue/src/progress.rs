//! Progress tracking for in-flight jobs.
//!
//! Progress is display state with its own records and TTL, deliberately
//! separate from the authoritative job lists. Updates for unknown jobs
//! are dropped silently because a record may simply have expired, and
//! the reported percentage only ever moves forward.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use indexer_core::{BatchProgress, IndexJob, JobId, ProgressStatus, ProgressUpdate, keys};
use store::Kv;

use crate::QueueError;

/// Fields an update may change alongside the percentage.
#[derive(Debug, Clone, Default)]
pub struct ProgressDetails {
    pub total_chunks: Option<usize>,
    pub processed_chunks: Option<usize>,
    pub status: Option<ProgressStatus>,
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    ttl: Duration,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl ProgressTracker {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Write the 0% seed record for a freshly assigned job.
    pub async fn initialize(&self, job: &IndexJob) -> Result<(), QueueError> {
        let record = ProgressUpdate::seed(job.id, job.doc_id.clone(), job.worker_id.clone());
        Kv::put(&keys::progress_key(job.id), &record, Some(self.ttl)).await?;
        Ok(())
    }

    pub async fn get(&self, job_id: JobId) -> Result<Option<ProgressUpdate>, QueueError> {
        Ok(Kv::get(&keys::progress_key(job_id)).await?)
    }

    /// Move a job's progress forward. A missing record makes this a silent
    /// no-op, and a percentage below the recorded one is clamped up so the
    /// number shown to users never goes backwards.
    pub async fn update(
        &self,
        job_id: JobId,
        progress: u8,
        details: ProgressDetails,
    ) -> Result<(), QueueError> {
        let key = keys::progress_key(job_id);
        let Some(mut record) = Kv::get::<ProgressUpdate>(&key).await? else {
            debug!(%job_id, "progress update for unknown job dropped");
            return Ok(());
        };

        record.progress = record.progress.max(progress.min(100));
        if let Some(total) = details.total_chunks {
            record.total_chunks = Some(total);
        }
        if let Some(processed) = details.processed_chunks {
            record.processed_chunks = processed;
        }
        if let Some(status) = details.status {
            record.status = status;
        }
        record.updated_at = Utc::now();
        record.estimated_remaining_secs = record.estimate_remaining(record.updated_at);

        Kv::put(&key, &record, Some(self.ttl)).await?;
        Ok(())
    }

    /// Record the start of one chunk sub-batch.
    pub async fn track_batch(&self, batch: &BatchProgress) -> Result<(), QueueError> {
        let key = keys::batch_progress_key(batch.job_id, &batch.batch_id);
        Kv::put(&key, batch, Some(self.ttl)).await?;
        Ok(())
    }

    /// Finalize one sub-batch and roll its chunks into the job record.
    ///
    /// An errored batch keeps `completed = false` and contributes no
    /// processed chunks; the job-level percentage is untouched by it.
    pub async fn complete_batch(
        &self,
        job_id: JobId,
        batch_id: &str,
        error: Option<String>,
    ) -> Result<(), QueueError> {
        let batch_key = keys::batch_progress_key(job_id, batch_id);
        let Some(mut batch) = Kv::get::<BatchProgress>(&batch_key).await? else {
            debug!(%job_id, batch_id, "batch completion for unknown batch dropped");
            return Ok(());
        };

        batch.ended_at = Some(Utc::now());
        if let Some(e) = error {
            warn!(%job_id, batch_id, error = %e, "chunk batch failed");
            batch.error = Some(e);
            Kv::put(&batch_key, &batch, Some(self.ttl)).await?;
            return Ok(());
        }
        batch.completed = true;
        Kv::put(&batch_key, &batch, Some(self.ttl)).await?;

        let job_key = keys::progress_key(job_id);
        let Some(mut record) = Kv::get::<ProgressUpdate>(&job_key).await? else {
            debug!(%job_id, "batch rollup for unknown job dropped");
            return Ok(());
        };

        record.processed_chunks += batch.chunk_count();
        let total = record.total_chunks.unwrap_or(batch.total_chunks).max(1);
        record.total_chunks = Some(total);
        let pct = ((record.processed_chunks * 100) / total).min(100) as u8;
        record.progress = record.progress.max(pct);
        record.updated_at = Utc::now();
        record.estimated_remaining_secs = record.estimate_remaining(record.updated_at);

        Kv::put(&job_key, &record, Some(self.ttl)).await?;
        Ok(())
    }
}
