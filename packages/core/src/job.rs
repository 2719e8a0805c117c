//! Job domain types for document-indexing work items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Maximum number of dequeue attempts before a job is terminally failed.
pub const MAX_ATTEMPTS: u32 = 3;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the externally-owned document a job indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority level carried on each job.
///
/// The pending list is FIFO; priority is recorded for operators but does
/// not reorder dequeueing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Upload metadata attached to a job by the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub filename: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub upload_date: DateTime<Utc>,
    /// Free-form extra fields forwarded by the upload handler.
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentMeta {
    pub fn new(filename: impl Into<String>, size: u64, upload_date: DateTime<Utc>) -> Self {
        Self {
            filename: filename.into(),
            size,
            title: None,
            upload_date,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// What a producer submits when enqueueing work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub doc_id: DocId,
    pub storage_path: String,
    pub metadata: DocumentMeta,
    #[serde(default)]
    pub priority: Priority,
}

/// One unit of indexing work tied to one document.
///
/// Optional fields correlate with lifecycle stages: `worker_id` and
/// `batch_id` appear once a worker owns the job, `progress`/`chunk_start`/
/// `chunk_end` while chunks are flowing, `error`/`failed_at` only on the
/// terminal failure path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: JobId,
    pub doc_id: DocId,
    pub storage_path: String,
    pub metadata: DocumentMeta,
    /// Number of dequeue attempts so far.
    #[serde(default)]
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

impl IndexJob {
    /// Create a new queued job from a producer's spec.
    pub fn new(spec: JobSpec) -> Self {
        Self {
            id: JobId::new(),
            doc_id: spec.doc_id,
            storage_path: spec.storage_path,
            metadata: spec.metadata,
            attempts: 0,
            created_at: Utc::now(),
            priority: spec.priority,
            worker_id: None,
            batch_id: None,
            progress: None,
            chunk_start: None,
            chunk_end: None,
            error: None,
            failed_at: None,
        }
    }

    /// Whether the bounded-retry budget still allows another attempt.
    pub fn can_retry(&self) -> bool {
        self.attempts < MAX_ATTEMPTS
    }
}

/// Where a job currently is, as answered by status lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a successfully indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResult {
    pub chunks_indexed: usize,
    pub total_chunks: usize,
    pub duration_ms: u64,
}

/// The immutable completed/failed record stored after a job leaves
/// active processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalRecord {
    pub job_id: JobId,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<IndexResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TerminalRecord {
    pub fn completed(job_id: JobId, result: IndexResult) -> Self {
        Self {
            job_id,
            state: JobState::Completed,
            result: Some(result),
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(job_id: JobId, error: impl Into<String>) -> Self {
        Self {
            job_id,
            state: JobState::Failed,
            result: None,
            error: Some(error.into()),
            finished_at: Utc::now(),
        }
    }
}

/// Point-in-time list sizes. Best-effort only; never used for
/// correctness decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: u64,
    pub processing: u64,
    pub failed: u64,
}

impl QueueStats {
    /// Jobs still in flight (queued + processing).
    pub fn active(&self) -> u64 {
        self.queued + self.processing
    }
}
