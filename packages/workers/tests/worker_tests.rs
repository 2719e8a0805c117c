mod common;

use std::error::Error;
use std::time::Duration;

use docstore::{DocStore, DocStoreConfig};
use indexer_core::{Chunk, JobState, WorkerStatus, keys};
use queue::{JobQueue, ProgressTracker};
use store::Hashes;
use workers::{WorkerConfig, WorkerPool};

const WAIT: Duration = Duration::from_secs(10);

fn fast_config(prefix: &str) -> WorkerConfig {
    WorkerConfig {
        id_prefix: prefix.to_string(),
        ..WorkerConfig::default()
    }
    .with_poll_interval(Duration::from_millis(50))
    .with_heartbeat_interval(Duration::from_millis(100))
    .with_chunk_size(500)
    .with_chunks_per_batch(2)
}

/// Uniform text with a paragraph break every 100 chars, so a 2500-char
/// document chunks evenly at size 500.
fn sample_text() -> String {
    let paragraph = "x".repeat(98);
    let mut text = String::new();
    for _ in 0..25 {
        text.push_str(&paragraph);
        text.push_str("\n\n");
    }
    text
}

#[tokio::test(flavor = "multi_thread")]
async fn a_worker_indexes_a_document_end_to_end() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup().await?;

    let docs = DocStore::new(DocStoreConfig::memory()).await?;
    let text = sample_text();
    docs.put_text("uploads/doc-e2e.txt", &text).await?;

    let queue = JobQueue::default();
    let job_id = queue
        .enqueue(common::spec("doc-e2e", "uploads/doc-e2e.txt"))
        .await?;

    let pool = WorkerPool::start(fast_config("e2e"), docs).await?;

    let state = common::wait_for(WAIT, || async {
        match queue.job_status(job_id).await {
            Ok(Some(state)) if state.is_terminal() => Some(state),
            _ => None,
        }
    })
    .await
    .ok_or("job never reached a terminal state")?;
    assert_eq!(state, JobState::Completed);

    // full rollup: every chunk processed, progress pegged at 100
    let tracker = ProgressTracker::default();
    let progress = tracker.get(job_id).await?.ok_or("no progress record")?;
    assert_eq!(progress.progress, 100);
    assert_eq!(progress.total_chunks, Some(5));
    assert_eq!(progress.processed_chunks, 5);

    // chunks persisted under the document's hash, offsets contiguous
    let chunks = Hashes::all::<Chunk>(&keys::chunks_key(&indexer_core::DocId::new("doc-e2e")))
        .await?;
    assert_eq!(chunks.len(), 5);
    let mut ordered: Vec<&Chunk> = chunks.values().collect();
    ordered.sort_by_key(|c| c.index);
    assert_eq!(ordered[0].start, 0);
    for pair in ordered.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert_eq!(ordered[4].end, text.chars().count());

    // the document record reflects the outcome
    let doc = queue::Documents::get(&indexer_core::DocId::new("doc-e2e"))
        .await?
        .ok_or("no document record")?;
    assert_eq!(doc.get("status").and_then(|s| s.as_str()), Some("indexed"));
    assert_eq!(doc.get("chunk_count").and_then(|c| c.as_u64()), Some(5));

    let idle = common::wait_for(WAIT, || async { pool.all_idle().await.then_some(()) }).await;
    assert!(idle.is_some(), "worker never went idle after its batch");

    pool.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn a_missing_document_fails_the_job_terminally() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup().await?;

    let docs = DocStore::new(DocStoreConfig::memory()).await?;
    let queue = JobQueue::default();
    let job_id = queue
        .enqueue(common::spec("doc-gone", "uploads/doc-gone.txt"))
        .await?;

    let pool = WorkerPool::start(fast_config("gone"), docs).await?;

    let state = common::wait_for(WAIT, || async {
        match queue.job_status(job_id).await {
            Ok(Some(state)) if state.is_terminal() => Some(state),
            _ => None,
        }
    })
    .await
    .ok_or("job never reached a terminal state")?;
    assert_eq!(state, JobState::Failed);

    let failed = queue.failed_jobs().await?;
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.is_some());

    // a permanent fetch error burns no extra attempts
    assert_eq!(failed[0].attempts, 1);

    let doc = queue::Documents::get(&indexer_core::DocId::new("doc-gone"))
        .await?
        .ok_or("no document record")?;
    assert_eq!(doc.get("status").and_then(|s| s.as_str()), Some("failed"));

    pool.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn workers_publish_their_status() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup().await?;

    let docs = DocStore::new(DocStoreConfig::memory()).await?;
    let pool = WorkerPool::start(fast_config("status").with_workers(2), docs).await?;
    let ids: Vec<String> = pool.worker_ids().iter().map(|s| s.to_string()).collect();
    assert_eq!(ids.len(), 2);

    let states = WorkerPool::worker_states().await?;
    for id in &ids {
        let state = states.get(id).ok_or("missing worker state")?;
        assert_eq!(state.status, WorkerStatus::Idle);
        assert_eq!(state.active_jobs, 0);
    }

    // heartbeats refresh the liveness timestamp
    let before = states[&ids[0]].last_heartbeat;
    let bumped = common::wait_for(WAIT, || async {
        let states = WorkerPool::worker_states().await.ok()?;
        (states.get(&ids[0])?.last_heartbeat > before).then_some(())
    })
    .await;
    assert!(bumped.is_some(), "heartbeat never advanced");

    // stop removes the published entries
    pool.stop().await?;
    let states = WorkerPool::worker_states().await?;
    for id in &ids {
        assert!(!states.contains_key(id));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn two_workers_split_a_backlog_without_overlap() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup().await?;

    let docs = DocStore::new(DocStoreConfig::memory()).await?;
    let queue = JobQueue::default();
    let mut job_ids = Vec::new();
    for i in 0..8 {
        let path = format!("uploads/doc-{i}.txt");
        docs.put_text(&path, &sample_text()).await?;
        job_ids.push(queue.enqueue(common::spec(&format!("doc-{i}"), &path)).await?);
    }

    let pool = WorkerPool::start(fast_config("pair").with_workers(2), docs).await?;

    for job_id in job_ids {
        let state = common::wait_for(WAIT, || async {
            match queue.job_status(job_id).await {
                Ok(Some(state)) if state.is_terminal() => Some(state),
                _ => None,
            }
        })
        .await
        .ok_or("job never reached a terminal state")?;
        assert_eq!(state, JobState::Completed);
    }

    let stats = queue.stats().await?;
    assert_eq!((stats.queued, stats.processing, stats.failed), (0, 0, 0));

    pool.stop().await?;
    Ok(())
}
