//! The indexing job queue.
//!
//! Three lists back the queue: pending, processing, and failed. New jobs
//! are pushed at the head of pending and workers pop batches from the
//! tail, so the queue drains oldest-first. Every structural change runs
//! inside a lock-manager critical section over the lists it touches, and
//! a job is always in exactly one of the three lists or the result store.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use indexer_core::{
    IndexJob, IndexResult, JobId, JobSpec, JobState, QueueStats, TerminalRecord, keys,
};
use store::{Kv, Lists};

use crate::{AtomicOps, Documents, LockManager, LockOptions, QueueError};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Largest batch a single dequeue hands to a worker.
    pub max_jobs_per_worker: usize,
    /// How long a terminal result record stays readable.
    pub result_ttl: Duration,
    pub lock: LockOptions,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_jobs_per_worker: 5,
            result_ttl: Duration::from_secs(24 * 60 * 60),
            lock: LockOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    config: QueueConfig,
    atomic: AtomicOps,
}

/// Where `fail` left the job, decided inside the critical section.
enum FailDisposition {
    Retried(u32),
    Terminal(Box<IndexJob>),
    Missing,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> Self {
        let lock = LockManager::new(config.lock.clone());
        Self {
            config,
            atomic: AtomicOps::new(lock),
        }
    }

    /// Add a job to the head of the pending queue and flag its document as
    /// processing. The document update is best-effort; the enqueued job is
    /// the source of truth.
    pub async fn enqueue(&self, spec: JobSpec) -> Result<JobId, QueueError> {
        let job = IndexJob::new(spec);
        let job_id = job.id;
        let doc_id = job.doc_id.clone();

        let pushed = self
            .atomic
            .with_list(keys::PENDING_QUEUE, |mut jobs: Vec<IndexJob>| async move {
                jobs.insert(0, job);
                let depth = jobs.len();
                Ok((jobs, depth))
            })
            .await?;

        let Some(depth) = pushed else {
            return Err(QueueError::LockUnavailable(keys::PENDING_QUEUE.into()));
        };

        if let Err(e) = Documents::mark_processing(&doc_id).await {
            warn!(%job_id, doc_id = doc_id.as_str(), error = %e, "failed to flag document as processing");
        }

        info!(%job_id, doc_id = doc_id.as_str(), depth, "job enqueued");
        Ok(job_id)
    }

    /// Pop up to `max_jobs_per_worker` jobs from the tail of pending,
    /// assign them to `worker_id`, and move them to processing, all under
    /// both list locks. Lock contention yields an empty batch; the worker
    /// polls again.
    pub async fn dequeue(&self, worker_id: &str) -> Result<Vec<IndexJob>, QueueError> {
        let max = self.config.max_jobs_per_worker;
        let batch = self
            .atomic
            .with_multiple_keys(&[keys::PENDING_QUEUE, keys::PROCESSING_QUEUE], || async {
                let mut pending: Vec<IndexJob> = Lists::read(keys::PENDING_QUEUE).await?;
                let mut processing: Vec<IndexJob> = Lists::read(keys::PROCESSING_QUEUE).await?;

                let mut batch = Vec::new();
                while batch.len() < max {
                    let Some(mut job) = pending.pop() else { break };
                    job.attempts += 1;
                    job.worker_id = Some(worker_id.to_string());
                    processing.push(job.clone());
                    batch.push(job);
                }

                Lists::write(keys::PENDING_QUEUE, &pending).await?;
                Lists::write(keys::PROCESSING_QUEUE, &processing).await?;
                Ok(batch)
            })
            .await?;

        match batch {
            Some(batch) => {
                if !batch.is_empty() {
                    info!(worker_id, count = batch.len(), "jobs dequeued");
                }
                Ok(batch)
            }
            None => {
                debug!(worker_id, "dequeue skipped, queue locks unavailable");
                Ok(Vec::new())
            }
        }
    }

    /// Record a successful job: remove it from processing and write its
    /// result record. Returns false when the job was not in processing,
    /// which happens when a completion races a failure for the same job.
    ///
    /// The terminal record is written inside the critical section, before
    /// the list write lands, so a concurrent status lookup always finds the
    /// job somewhere: still in processing, or already in the result store.
    /// A record-write error leaves the processing list untouched and the
    /// completion retryable.
    pub async fn complete(&self, job_id: JobId, result: IndexResult) -> Result<bool, QueueError> {
        let chunks = result.chunks_indexed;
        let result_ttl = self.config.result_ttl;
        let removed = self
            .atomic
            .with_list(
                keys::PROCESSING_QUEUE,
                |mut jobs: Vec<IndexJob>| async move {
                    let Some(pos) = jobs.iter().position(|j| j.id == job_id) else {
                        return Ok((jobs, None));
                    };
                    let job = jobs.remove(pos);
                    let record = TerminalRecord::completed(job_id, result);
                    Kv::put(&keys::result_key(job_id), &record, Some(result_ttl)).await?;
                    Ok((jobs, Some(job)))
                },
            )
            .await?;

        let Some(removed) = removed else {
            return Err(QueueError::LockUnavailable(keys::PROCESSING_QUEUE.into()));
        };
        let Some(job) = removed else {
            warn!(%job_id, "completion for a job not in processing");
            return Ok(false);
        };

        if let Err(e) = Documents::mark_indexed(&job.doc_id, chunks).await {
            warn!(%job_id, error = %e, "failed to flag document as indexed");
        }

        info!(%job_id, chunks, "job completed");
        Ok(true)
    }

    /// Record a failed attempt. With `retry` set and attempts remaining the
    /// job goes back to the head of pending; otherwise it lands on the
    /// failed list and gets a terminal result record.
    pub async fn fail(
        &self,
        job_id: JobId,
        error: &str,
        retry: bool,
    ) -> Result<bool, QueueError> {
        let error = error.to_string();
        let disposition = self
            .atomic
            .with_multiple_keys(
                &[
                    keys::PENDING_QUEUE,
                    keys::PROCESSING_QUEUE,
                    keys::FAILED_LIST,
                ],
                || async {
                    let mut processing: Vec<IndexJob> = Lists::read(keys::PROCESSING_QUEUE).await?;
                    let Some(pos) = processing.iter().position(|j| j.id == job_id) else {
                        return Ok(FailDisposition::Missing);
                    };
                    let mut job = processing.remove(pos);
                    Lists::write(keys::PROCESSING_QUEUE, &processing).await?;

                    if retry && job.can_retry() {
                        let attempts = job.attempts;
                        job.worker_id = None;
                        job.error = Some(error.clone());
                        let mut pending: Vec<IndexJob> = Lists::read(keys::PENDING_QUEUE).await?;
                        pending.insert(0, job);
                        Lists::write(keys::PENDING_QUEUE, &pending).await?;
                        Ok(FailDisposition::Retried(attempts))
                    } else {
                        job.error = Some(error.clone());
                        job.failed_at = Some(Utc::now());
                        let mut failed: Vec<IndexJob> = Lists::read(keys::FAILED_LIST).await?;
                        failed.push(job.clone());
                        Lists::write(keys::FAILED_LIST, &failed).await?;
                        Ok(FailDisposition::Terminal(Box::new(job)))
                    }
                },
            )
            .await?;

        let Some(disposition) = disposition else {
            return Err(QueueError::LockUnavailable(keys::PROCESSING_QUEUE.into()));
        };

        match disposition {
            FailDisposition::Retried(attempts) => {
                info!(%job_id, attempts, "job requeued for retry");
                Ok(true)
            }
            FailDisposition::Terminal(job) => {
                let record = TerminalRecord::failed(job_id, error.clone());
                Kv::put(&keys::result_key(job_id), &record, Some(self.config.result_ttl))
                    .await?;
                if let Err(e) = Documents::mark_failed(&job.doc_id, &error).await {
                    warn!(%job_id, error = %e, "failed to flag document as failed");
                }
                warn!(%job_id, attempts = job.attempts, error, "job failed terminally");
                Ok(true)
            }
            FailDisposition::Missing => {
                warn!(%job_id, "failure report for a job not in processing");
                Ok(false)
            }
        }
    }

    /// Point-in-time list depths. Reads are lock-free, so the three counts
    /// may straddle a concurrent move between lists.
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(QueueStats {
            queued: Lists::len(keys::PENDING_QUEUE).await? as u64,
            processing: Lists::len(keys::PROCESSING_QUEUE).await? as u64,
            failed: Lists::len(keys::FAILED_LIST).await? as u64,
        })
    }

    /// Locate a job: terminal result record first, then the live lists.
    pub async fn job_status(&self, job_id: JobId) -> Result<Option<JobState>, QueueError> {
        let record: Option<TerminalRecord> = Kv::get(&keys::result_key(job_id)).await?;
        if let Some(record) = record {
            return Ok(Some(record.state));
        }

        let processing: Vec<IndexJob> = Lists::read(keys::PROCESSING_QUEUE).await?;
        if processing.iter().any(|j| j.id == job_id) {
            return Ok(Some(JobState::Processing));
        }

        let pending: Vec<IndexJob> = Lists::read(keys::PENDING_QUEUE).await?;
        if pending.iter().any(|j| j.id == job_id) {
            return Ok(Some(JobState::Queued));
        }

        let failed: Vec<IndexJob> = Lists::read(keys::FAILED_LIST).await?;
        if failed.iter().any(|j| j.id == job_id) {
            return Ok(Some(JobState::Failed));
        }

        Ok(None)
    }

    /// Every job currently on the failed list, oldest first.
    pub async fn failed_jobs(&self) -> Result<Vec<IndexJob>, QueueError> {
        Ok(Lists::read(keys::FAILED_LIST).await?)
    }
}
