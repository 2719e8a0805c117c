//! Pool lifecycle for worker actors.

use std::collections::HashMap;
use std::time::Duration;

use ractor::{Actor, ActorRef};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use ulid::Ulid;

use docstore::DocStore;
use indexer_core::{WorkerState, keys};
use queue::{JobQueue, ProgressTracker, QueueConfig};
use store::Hashes;

use crate::actor::{WorkerActor, WorkerArgs};
use crate::messages::WorkerMessage;
use crate::processor::IndexProcessor;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] ractor::SpawnErr),

    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker ids are `<prefix>-<n>-<ulid>`.
    pub id_prefix: String,
    pub workers: usize,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Chunks persisted per progress sub-batch.
    pub chunks_per_batch: usize,
    pub progress_ttl: Duration,
    pub queue: QueueConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id_prefix: "worker".to_string(),
            workers: 1,
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(10),
            chunk_size: 500,
            chunks_per_batch: 10,
            progress_ttl: Duration::from_secs(60 * 60),
            queue: QueueConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_chunks_per_batch(mut self, chunks: usize) -> Self {
        self.chunks_per_batch = chunks.max(1);
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}

/// A running set of worker actors sharing one queue and document store.
pub struct WorkerPool {
    workers: Vec<(String, ActorRef<WorkerMessage>, JoinHandle<()>)>,
}

impl WorkerPool {
    /// Spawn `config.workers` actors. The store must already be
    /// initialized.
    pub async fn start(config: WorkerConfig, docs: DocStore) -> Result<Self, WorkerError> {
        let queue = JobQueue::new(config.queue.clone());
        let tracker = ProgressTracker::new(config.progress_ttl);
        let processor = IndexProcessor::new(
            queue.clone(),
            tracker,
            docs,
            config.chunk_size,
            config.chunks_per_batch,
        );

        let mut workers = Vec::with_capacity(config.workers);
        for n in 0..config.workers {
            let worker_id = format!("{}-{n}-{}", config.id_prefix, Ulid::new());
            let args = WorkerArgs {
                worker_id: worker_id.clone(),
                processor: processor.clone(),
                poll_interval: config.poll_interval,
                heartbeat_interval: config.heartbeat_interval,
                queue: queue.clone(),
            };
            let (actor, handle) =
                Actor::spawn(Some(worker_id.clone()), WorkerActor, args).await?;
            workers.push((worker_id, actor, handle));
        }

        info!(count = workers.len(), "worker pool started");
        Ok(Self { workers })
    }

    /// Ask every worker to stop after its in-flight batch and wait for
    /// the actors to exit. Status hash entries are removed on the way out.
    pub async fn stop(self) -> Result<(), WorkerError> {
        for (worker_id, actor, _) in &self.workers {
            if actor.send_message(WorkerMessage::Shutdown).is_err() {
                warn!(worker_id, "worker already stopped");
            }
        }
        for (worker_id, _, handle) in self.workers {
            if let Err(e) = handle.await {
                warn!(worker_id, error = %e, "worker task ended abnormally");
            }
            Hashes::delete(keys::WORKER_STATUS, &worker_id).await?;
        }
        info!("worker pool stopped");
        Ok(())
    }

    pub fn worker_ids(&self) -> Vec<&str> {
        self.workers.iter().map(|(id, _, _)| id.as_str()).collect()
    }

    /// True when no worker has a batch in flight. Workers that fail to
    /// answer within the timeout count as busy.
    pub async fn all_idle(&self) -> bool {
        for (_, actor, _) in &self.workers {
            let answer = ractor::rpc::call(
                actor,
                |reply| WorkerMessage::IsIdle { reply },
                Some(Duration::from_secs(1)),
            )
            .await;
            match answer {
                Ok(ractor::rpc::CallResult::Success(true)) => {}
                _ => return false,
            }
        }
        true
    }

    /// Snapshot of every worker's published state.
    pub async fn worker_states() -> Result<HashMap<String, WorkerState>, WorkerError> {
        Ok(Hashes::all(keys::WORKER_STATUS).await?)
    }
}
