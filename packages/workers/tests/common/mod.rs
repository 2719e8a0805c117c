use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};

use indexer_core::{DocId, DocumentMeta, JobSpec, Priority};
use store::{StoreConfig, StoreError};

static TEST_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

// The store connection is a process-wide singleton, but each #[tokio::test]
// gets its own runtime. Initialize the connection on a runtime that lives for
// the whole test process so its driver task survives across tests.
static STORE_RT: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("store runtime")
});

pub async fn setup() -> Result<MutexGuard<'static, ()>, StoreError> {
    let guard = TEST_LOCK.lock().await;
    STORE_RT
        .spawn(store::init(StoreConfig::memory()))
        .await
        .expect("store init task panicked")?;
    let db = store::get_db()?;
    db.query("DELETE kv; DELETE list; DELETE hash_entry; DELETE document;")
        .await?
        .check()?;
    Ok(guard)
}

pub fn spec(doc_id: &str, storage_path: &str) -> JobSpec {
    JobSpec {
        doc_id: DocId::new(doc_id),
        storage_path: storage_path.to_string(),
        metadata: DocumentMeta::new(format!("{doc_id}.txt"), 2500, Utc::now()),
        priority: Priority::Normal,
    }
}

/// Poll `check` until it yields `Some` or the timeout passes.
pub async fn wait_for<T, F, Fut>(timeout: Duration, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(v) = check().await {
            return Some(v);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
