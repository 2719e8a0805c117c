//! Shared key-value store client for the indexing queue.
//!
//! Every component of the queue talks to one networked store. This crate
//! wraps SurrealDB behind the small set of primitives the queue needs:
//!
//! - conditional create-with-expiry (`Kv::put_nx`) for lock acquisition
//! - atomic compare-and-delete (`Kv::delete_if_eq`) for lock release
//! - TTL-aware JSON value get/put (`Kv`)
//! - whole-list read/write (`Lists`) — callers serialize mutations
//!   through the lock manager
//! - hash field operations (`Hashes`)
//! - a native atomic counter (`Kv::incr`)
//!
//! # Features
//!
//! - `memory` (default): in-memory engine, used by tests
//! - `rocksdb`: persistent file-based storage

mod connection;
mod ops;
mod schema;

pub use connection::{Database, StoreConfig, StoreError, get_db, init_store};
pub use ops::{Hashes, Kv, Lists};
pub use schema::init_schema;

/// Initialize the store with the given configuration.
///
/// This should be called once at application startup.
pub async fn init(config: StoreConfig) -> Result<(), StoreError> {
    init_store(config).await?;
    init_schema().await?;
    Ok(())
}
