//! Progress records for jobs and chunk batches.
//!
//! These are display/telemetry state with an independent lifecycle from the
//! authoritative job records in the queue lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DocId, JobId};

/// Display status carried on a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Per-job progress record, superseded in place on each update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    pub doc_id: DocId,
    /// 0..=100.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(default)]
    pub processed_chunks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_secs: Option<f64>,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressUpdate {
    /// Seed a record at 0% for a freshly dequeued job.
    pub fn seed(job_id: JobId, doc_id: DocId, worker_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            doc_id,
            progress: 0,
            total_chunks: None,
            processed_chunks: 0,
            estimated_remaining_secs: None,
            status: ProgressStatus::Processing,
            worker_id,
            started_at: now,
            updated_at: now,
        }
    }

    /// ETA derived from elapsed time and remaining percentage.
    /// Undefined (None) until some progress exists.
    pub fn estimate_remaining(&self, now: DateTime<Utc>) -> Option<f64> {
        if self.progress == 0 {
            return None;
        }
        let elapsed = (now - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let p = f64::from(self.progress);
        Some(elapsed * (100.0 - p) / p)
    }
}

/// Bookkeeping for one contiguous sub-batch of a document's chunks.
///
/// `end_index` is exclusive. Written at batch start, finalized at batch
/// end; `completed` stays false for errored batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub batch_id: String,
    pub job_id: JobId,
    pub start_index: usize,
    pub end_index: usize,
    pub total_chunks: usize,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl BatchProgress {
    pub fn start(
        batch_id: impl Into<String>,
        job_id: JobId,
        start_index: usize,
        end_index: usize,
        total_chunks: usize,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            job_id,
            start_index,
            end_index,
            total_chunks,
            completed: false,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Number of chunks this batch covers.
    pub fn chunk_count(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn eta_is_undefined_at_zero_progress() {
        let p = ProgressUpdate::seed(JobId::new(), DocId::new("d"), None);
        assert_eq!(p.estimate_remaining(Utc::now()), None);
    }

    #[test]
    fn eta_scales_with_remaining_percentage() {
        let mut p = ProgressUpdate::seed(JobId::new(), DocId::new("d"), None);
        p.progress = 25;
        let now = p.started_at + Duration::seconds(10);
        // 10s elapsed for 25% -> 30s remaining for the other 75%.
        let eta = p.estimate_remaining(now).unwrap();
        assert!((eta - 30.0).abs() < 0.01);
    }

    #[test]
    fn batch_chunk_count_uses_exclusive_end() {
        let b = BatchProgress::start("b-0", JobId::new(), 10, 20, 50);
        assert_eq!(b.chunk_count(), 10);
        assert!(!b.completed);
    }
}
