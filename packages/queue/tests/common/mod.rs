use std::sync::LazyLock;

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

#[allow(dead_code)]
pub fn spec(doc_id: &str) -> JobSpec {
    JobSpec {
        doc_id: DocId::new(doc_id),
        storage_path: format!("uploads/{doc_id}.txt"),
        metadata: DocumentMeta::new(format!("{doc_id}.txt"), 128, Utc::now()),
        priority: Priority::Normal,
    }
}
