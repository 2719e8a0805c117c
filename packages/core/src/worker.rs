//! Worker state records published for liveness and ops visibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current condition of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Active,
    Error,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "idle"),
            WorkerStatus::Active => write!(f, "active"),
            WorkerStatus::Error => write!(f, "error"),
        }
    }
}

/// One entry per live worker in the shared `worker_status` hash.
///
/// Written only by the owning worker; anyone may read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerState {
    pub worker_id: String,
    pub status: WorkerStatus,
    pub active_jobs: u32,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerState {
    /// A freshly registered idle worker.
    pub fn idle(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            status: WorkerStatus::Idle,
            active_jobs: 0,
            last_heartbeat: Utc::now(),
            error: None,
        }
    }

    /// Mark the worker active on `jobs` concurrent jobs.
    pub fn active(mut self, jobs: u32) -> Self {
        self.status = WorkerStatus::Active;
        self.active_jobs = jobs;
        self.error = None;
        self
    }

    /// Record a worker-level error.
    pub fn errored(mut self, error: impl Into<String>) -> Self {
        self.status = WorkerStatus::Error;
        self.error = Some(error.into());
        self
    }

    /// Refresh the liveness timestamp.
    pub fn beat(mut self) -> Self {
        self.last_heartbeat = Utc::now();
        self
    }
}
