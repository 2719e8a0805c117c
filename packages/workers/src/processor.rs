//! The indexing pipeline a worker runs for each job.
//!
//! Fetch the document text, chunk it, persist chunks in sub-batches with
//! progress reporting, then settle the job with the queue. A sub-batch
//! that errors is isolated: later batches still run and the job still
//! completes, with the errored batch's chunks missing from the count.

use std::time::Instant;

use tracing::{info, warn};

use docstore::DocStore;
use indexer_core::{BatchProgress, Chunk, IndexJob, IndexResult, chunk_text, keys};
use queue::{JobQueue, ProgressDetails, ProgressTracker, QueueError};
use store::Hashes;

/// What `process` tells the worker actor about one job.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    /// The job hit its retry limit or a permanent error and will not run
    /// again.
    pub terminal_failure: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct IndexProcessor {
    queue: JobQueue,
    tracker: ProgressTracker,
    docs: DocStore,
    chunk_size: usize,
    chunks_per_batch: usize,
}

impl IndexProcessor {
    pub fn new(
        queue: JobQueue,
        tracker: ProgressTracker,
        docs: DocStore,
        chunk_size: usize,
        chunks_per_batch: usize,
    ) -> Self {
        Self {
            queue,
            tracker,
            docs,
            chunk_size,
            chunks_per_batch: chunks_per_batch.max(1),
        }
    }

    /// Run one job end to end. All outcomes are reported to the queue and
    /// progress tracker here; the returned outcome only feeds the worker's
    /// own status record.
    pub async fn process(&self, job: IndexJob) -> JobOutcome {
        let started = Instant::now();
        if let Err(e) = self.tracker.initialize(&job).await {
            warn!(job_id = %job.id, error = %e, "failed to seed progress record");
        }

        let text = match self.docs.fetch_text(&job.storage_path).await {
            Ok(text) => text,
            Err(e) => {
                let retryable = !e.is_permanent();
                return self.settle_failure(&job, &e.to_string(), retryable).await;
            }
        };

        let chunks = chunk_text(&text, self.chunk_size);
        let total = chunks.len();
        if let Err(e) = self
            .tracker
            .update(
                job.id,
                0,
                ProgressDetails {
                    total_chunks: Some(total),
                    ..ProgressDetails::default()
                },
            )
            .await
        {
            warn!(job_id = %job.id, error = %e, "failed to record chunk total");
        }

        let mut indexed = 0usize;
        for (batch_no, batch) in chunks.chunks(self.chunks_per_batch).enumerate() {
            match self.run_batch(&job, batch_no, batch, total).await {
                Ok(count) => indexed += count,
                Err(e) => {
                    warn!(job_id = %job.id, batch_no, error = %e, "chunk batch failed");
                }
            }
        }

        let result = IndexResult {
            chunks_indexed: indexed,
            total_chunks: total,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        match self.queue.complete(job.id, result).await {
            Ok(true) => {
                info!(job_id = %job.id, chunks = indexed, total, "document indexed");
                JobOutcome::default()
            }
            Ok(false) => JobOutcome::default(),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "failed to report completion");
                JobOutcome {
                    terminal_failure: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Persist one contiguous sub-batch of chunks, reporting per-chunk
    /// progress. The final percentage is left to the batch rollup, so
    /// per-chunk reports stop at 99.
    async fn run_batch(
        &self,
        job: &IndexJob,
        batch_no: usize,
        batch: &[Chunk],
        total: usize,
    ) -> Result<usize, QueueError> {
        let Some(first) = batch.first() else {
            return Ok(0);
        };
        let batch_id = format!("b-{batch_no}");
        let progress = BatchProgress::start(
            &batch_id,
            job.id,
            first.index,
            first.index + batch.len(),
            total,
        );
        self.tracker.track_batch(&progress).await?;

        let outcome = self.persist_chunks(job, batch, total).await;
        match outcome {
            Ok(()) => {
                self.tracker.complete_batch(job.id, &batch_id, None).await?;
                Ok(batch.len())
            }
            Err(e) => {
                self.tracker
                    .complete_batch(job.id, &batch_id, Some(e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }

    async fn persist_chunks(
        &self,
        job: &IndexJob,
        batch: &[Chunk],
        total: usize,
    ) -> Result<(), QueueError> {
        let hash = keys::chunks_key(&job.doc_id);
        for chunk in batch {
            Hashes::put(&hash, &chunk.index.to_string(), chunk)
                .await
                .map_err(QueueError::from)?;

            let pct = (((chunk.index + 1) * 100) / total.max(1)).min(99) as u8;
            self.tracker
                .update(job.id, pct, ProgressDetails::default())
                .await?;
        }
        Ok(())
    }

    async fn settle_failure(&self, job: &IndexJob, error: &str, retryable: bool) -> JobOutcome {
        let terminal = !retryable || !job.can_retry();
        if let Err(e) = self.queue.fail(job.id, error, retryable).await {
            warn!(job_id = %job.id, error = %e, "failed to report job failure");
        }
        if terminal {
            warn!(job_id = %job.id, attempts = job.attempts, error, "job failed terminally");
        } else {
            info!(job_id = %job.id, attempts = job.attempts, error, "job will retry");
        }
        JobOutcome {
            terminal_failure: terminal,
            error: Some(error.to_string()),
        }
    }
}
