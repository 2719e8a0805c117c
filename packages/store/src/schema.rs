//! Store schema definitions using SurrealQL.

use crate::{StoreError, get_db};

/// Initialize the store schema.
///
/// This creates all necessary tables and indexes.
pub async fn init_schema() -> Result<(), StoreError> {
    let db = get_db()?;

    tracing::info!("Initializing store schema...");

    db.query(KV_SCHEMA).await?.check()?;
    db.query(LIST_SCHEMA).await?.check()?;
    db.query(HASH_SCHEMA).await?.check()?;
    db.query(DOCUMENT_SCHEMA).await?.check()?;

    tracing::info!("Store schema initialized");

    Ok(())
}

/// Keyed JSON values, optionally expiring.
///
/// `expires_at` is epoch milliseconds so SurrealQL comparisons stay
/// numeric.
const KV_SCHEMA: &str = r#"
-- Plain keyed values (locks, results, progress records, counters)
DEFINE TABLE IF NOT EXISTS kv SCHEMALESS;
DEFINE INDEX IF NOT EXISTS kv_expiry ON kv FIELDS expires_at;
"#;

/// Named lists, one record per list holding the whole array.
const LIST_SCHEMA: &str = r#"
-- Named lists (pending/processing/failed queues)
DEFINE TABLE IF NOT EXISTS list SCHEMALESS;
"#;

/// Hash fields, one record per (hash, field) pair.
const HASH_SCHEMA: &str = r#"
-- Hash fields (worker status, persisted chunks)
DEFINE TABLE IF NOT EXISTS hash_entry SCHEMALESS;
DEFINE INDEX IF NOT EXISTS hash_entry_hash ON hash_entry FIELDS hash;
"#;

/// Document records, shared with the upload side.
const DOCUMENT_SCHEMA: &str = r#"
-- Document status records keyed by document id
DEFINE TABLE IF NOT EXISTS document SCHEMALESS;
"#;
