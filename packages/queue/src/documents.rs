//! Status writes on externally-owned document records.
//!
//! The queue mirrors job lifecycle onto the `document` table so readers
//! outside the pipeline see what happened to an upload. These writes are
//! best-effort from the queue's point of view; callers log failures and
//! carry on. Merges touch only the queue-owned fields, so upload-side
//! fields on the same record survive.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use indexer_core::DocId;
use store::{StoreError, get_db};

use crate::QueueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processing,
    Indexed,
    Failed,
}

pub struct Documents;

impl Documents {
    pub async fn mark_processing(doc_id: &DocId) -> Result<(), QueueError> {
        let db = get_db()?;
        let _: Option<serde_json::Value> = db
            .upsert(("document", doc_id.as_str().to_string()))
            .merge(json!({ "status": DocumentStatus::Processing }))
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub async fn mark_indexed(doc_id: &DocId, chunk_count: usize) -> Result<(), QueueError> {
        let db = get_db()?;
        let _: Option<serde_json::Value> = db
            .upsert(("document", doc_id.as_str().to_string()))
            .merge(json!({
                "status": DocumentStatus::Indexed,
                "chunk_count": chunk_count,
                "indexed_at": Utc::now(),
                "error": serde_json::Value::Null,
            }))
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub async fn mark_failed(doc_id: &DocId, error: &str) -> Result<(), QueueError> {
        let db = get_db()?;
        let _: Option<serde_json::Value> = db
            .upsert(("document", doc_id.as_str().to_string()))
            .merge(json!({
                "status": DocumentStatus::Failed,
                "error": error,
                "failed_at": Utc::now(),
            }))
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// Read the raw document record; used by status endpoints and tests.
    pub async fn get(doc_id: &DocId) -> Result<Option<serde_json::Value>, QueueError> {
        let db = get_db()?;
        let record: Option<serde_json::Value> = db
            .select(("document", doc_id.as_str().to_string()))
            .await
            .map_err(StoreError::from)?;
        Ok(record)
    }
}
