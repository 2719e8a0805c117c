//! Worker actor that polls the queue and runs indexing jobs.

use std::time::Duration;

use futures_util::future::join_all;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tracing::{info, warn};

use indexer_core::{WorkerState, keys};
use store::Hashes;

use crate::messages::WorkerMessage;
use crate::processor::IndexProcessor;

/// State for a worker actor.
pub struct WorkerActorState {
    pub worker_id: String,
    pub processor: IndexProcessor,
    pub queue: queue::JobQueue,
    /// Jobs in the currently spawned batch; zero when idle.
    pub active_jobs: usize,
    /// Set by `Shutdown` while a batch is in flight; the actor stops on
    /// the next `BatchDone`.
    pub draining: bool,
}

impl WorkerActorState {
    pub fn is_idle(&self) -> bool {
        self.active_jobs == 0
    }

    /// Write this worker's entry in the shared status hash. Only the
    /// owning worker writes its entry.
    async fn publish(&self, state: WorkerState) {
        if let Err(e) = Hashes::put(keys::WORKER_STATUS, &self.worker_id, &state).await {
            warn!(worker_id = self.worker_id, error = %e, "failed to publish worker state");
        }
    }
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub processor: IndexProcessor,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub queue: queue::JobQueue,
}

pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(worker_id = args.worker_id, "starting worker");

        let state = WorkerActorState {
            worker_id: args.worker_id,
            processor: args.processor,
            queue: args.queue,
            active_jobs: 0,
            draining: false,
        };
        state.publish(WorkerState::idle(&state.worker_id)).await;

        let poller = myself.clone();
        let poll_interval = args.poll_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                if poller.send_message(WorkerMessage::Poll).is_err() {
                    break;
                }
            }
        });

        let beater = myself.clone();
        let heartbeat_interval = args.heartbeat_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(heartbeat_interval).await;
                if beater.send_message(WorkerMessage::Heartbeat).is_err() {
                    break;
                }
            }
        });

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Poll => {
                if state.draining || !state.is_idle() {
                    return Ok(());
                }

                let batch = match state.queue.dequeue(&state.worker_id).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(worker_id = state.worker_id, error = %e, "dequeue failed");
                        return Ok(());
                    }
                };
                if batch.is_empty() {
                    return Ok(());
                }

                state.active_jobs = batch.len();
                state
                    .publish(WorkerState::idle(&state.worker_id).active(batch.len() as u32))
                    .await;

                let processor = state.processor.clone();
                let reporter = myself.clone();
                tokio::spawn(async move {
                    let jobs = batch.len();
                    let outcomes =
                        join_all(batch.into_iter().map(|job| processor.process(job))).await;
                    let terminal_failures =
                        outcomes.iter().filter(|o| o.terminal_failure).count();
                    let last_error = outcomes
                        .into_iter()
                        .filter_map(|o| o.error)
                        .next_back();
                    let _ = reporter.send_message(WorkerMessage::BatchDone {
                        jobs,
                        terminal_failures,
                        last_error,
                    });
                });
            }

            WorkerMessage::BatchDone {
                jobs,
                terminal_failures,
                last_error,
            } => {
                state.active_jobs = 0;
                let worker_state = if terminal_failures > 0 {
                    WorkerState::idle(&state.worker_id)
                        .errored(last_error.unwrap_or_else(|| "job failed".to_string()))
                } else {
                    WorkerState::idle(&state.worker_id)
                };
                state.publish(worker_state).await;
                info!(
                    worker_id = state.worker_id,
                    jobs, terminal_failures, "batch finished"
                );

                if state.draining {
                    myself.stop(None);
                }
            }

            WorkerMessage::Heartbeat => {
                let current: Option<WorkerState> =
                    match Hashes::get(keys::WORKER_STATUS, &state.worker_id).await {
                        Ok(current) => current,
                        Err(e) => {
                            warn!(worker_id = state.worker_id, error = %e, "heartbeat read failed");
                            None
                        }
                    };
                let refreshed = current
                    .unwrap_or_else(|| WorkerState::idle(&state.worker_id))
                    .beat();
                state.publish(refreshed).await;
            }

            WorkerMessage::IsIdle { reply } => {
                let _ = reply.send(state.is_idle());
            }

            WorkerMessage::Shutdown => {
                if state.is_idle() {
                    info!(worker_id = state.worker_id, "worker stopping");
                    myself.stop(None);
                } else {
                    info!(worker_id = state.worker_id, "worker draining before stop");
                    state.draining = true;
                }
            }
        }

        Ok(())
    }
}
