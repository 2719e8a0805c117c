//! Store primitives: keyed values, lists, and hashes.
//!
//! All operations go through the shared connection. Values are stored as
//! JSON so every component can persist its own record types.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use surrealdb::sql::Thing;

use crate::{StoreError, get_db};

/// Internal record for the `kv` table.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct KvRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    value: serde_json::Value,
    /// Epoch milliseconds; absent means the value never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl KvRecord {
    fn new(value: serde_json::Value, ttl: Option<Duration>) -> Self {
        Self {
            id: None,
            value,
            expires_at: ttl.map(|t| Utc::now().timestamp_millis() + t.as_millis() as i64),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| at <= Utc::now().timestamp_millis())
    }
}

/// Internal record for the `list` table.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ListRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    items: Vec<serde_json::Value>,
}

/// Internal record for the `hash_entry` table.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct HashRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    hash: String,
    field: String,
    value: serde_json::Value,
}

fn is_record_exists(err: &surrealdb::Error) -> bool {
    matches!(
        err,
        surrealdb::Error::Db(surrealdb::error::Db::RecordExists { .. })
    )
}

/// Keyed JSON values with optional expiry.
pub struct Kv;

impl Kv {
    /// Write a value, replacing any existing one.
    pub async fn put<T: Serialize>(
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let db = get_db()?;
        let record = KvRecord::new(serde_json::to_value(value)?, ttl);
        let _: Option<KvRecord> = db.upsert(("kv", key.to_string())).content(record).await?;
        Ok(())
    }

    /// Read a value. Expired records read as `None` and are swept.
    pub async fn get<T: DeserializeOwned>(key: &str) -> Result<Option<T>, StoreError> {
        let db = get_db()?;
        let record: Option<KvRecord> = db.select(("kv", key.to_string())).await?;
        match record {
            Some(r) if r.is_expired() => {
                let _: Option<KvRecord> = db.delete(("kv", key.to_string())).await?;
                Ok(None)
            }
            Some(r) => Ok(Some(serde_json::from_value(r.value)?)),
            None => Ok(None),
        }
    }

    /// Atomic create-if-absent with expiry. Returns false when the key is
    /// already held by a live value.
    ///
    /// An expired holder is swept first; the sweep only ever removes
    /// already-expired records, and the create itself is atomic, so two
    /// racing callers still produce exactly one winner.
    pub async fn put_nx<T: Serialize>(
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let db = get_db()?;
        db.query("DELETE type::thing('kv', $key) WHERE expires_at != NONE AND expires_at <= $now")
            .bind(("key", key.to_string()))
            .bind(("now", Utc::now().timestamp_millis()))
            .await?
            .check()?;

        let record = KvRecord::new(serde_json::to_value(value)?, ttl);
        let created: Result<Option<KvRecord>, surrealdb::Error> =
            db.create(("kv", key.to_string())).content(record).await;
        match created {
            Ok(_) => Ok(true),
            Err(e) if is_record_exists(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a key unconditionally.
    pub async fn delete(key: &str) -> Result<(), StoreError> {
        let db = get_db()?;
        let _: Option<KvRecord> = db.delete(("kv", key.to_string())).await?;
        Ok(())
    }

    /// Single-statement compare-and-delete. Returns true only when the
    /// stored value equalled `expected` and was removed.
    pub async fn delete_if_eq<T: Serialize>(key: &str, expected: &T) -> Result<bool, StoreError> {
        let db = get_db()?;
        let mut response = db
            .query("DELETE type::thing('kv', $key) WHERE value = $value RETURN BEFORE")
            .bind(("key", key.to_string()))
            .bind(("value", serde_json::to_value(expected)?))
            .await?;
        let deleted: Vec<KvRecord> = response.take(0)?;
        Ok(!deleted.is_empty())
    }

    /// Native atomic increment; creates the counter at `delta` when absent.
    pub async fn incr(key: &str, delta: i64) -> Result<i64, StoreError> {
        let db = get_db()?;
        let mut response = db
            .query("UPSERT type::thing('kv', $key) SET value += $delta RETURN AFTER")
            .bind(("key", key.to_string()))
            .bind(("delta", delta))
            .await?;
        let records: Vec<KvRecord> = response.take(0)?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Query(format!("counter {key} returned no record")))?;
        record
            .value
            .as_i64()
            .ok_or_else(|| StoreError::Query(format!("counter {key} holds a non-integer value")))
    }
}

/// Named lists stored whole. Read-modify-write sequences on these must run
/// inside a lock-manager critical section.
pub struct Lists;

impl Lists {
    /// Read the whole list; a missing list is empty.
    pub async fn read<T: DeserializeOwned>(name: &str) -> Result<Vec<T>, StoreError> {
        let db = get_db()?;
        let record: Option<ListRecord> = db.select(("list", name.to_string())).await?;
        let items = record.map(|r| r.items).unwrap_or_default();
        items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    /// Replace the whole list.
    pub async fn write<T: Serialize>(name: &str, items: &[T]) -> Result<(), StoreError> {
        let db = get_db()?;
        let items = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let record = ListRecord { id: None, items };
        let _: Option<ListRecord> = db.upsert(("list", name.to_string())).content(record).await?;
        Ok(())
    }

    /// Current length; a missing list has length zero.
    pub async fn len(name: &str) -> Result<usize, StoreError> {
        let db = get_db()?;
        let record: Option<ListRecord> = db.select(("list", name.to_string())).await?;
        Ok(record.map(|r| r.items.len()).unwrap_or(0))
    }

    /// Drop the list record entirely.
    pub async fn clear(name: &str) -> Result<(), StoreError> {
        let db = get_db()?;
        let _: Option<ListRecord> = db.delete(("list", name.to_string())).await?;
        Ok(())
    }
}

/// Hash field operations, one record per (hash, field) pair.
pub struct Hashes;

impl Hashes {
    fn entry_id(hash: &str, field: &str) -> String {
        format!("{hash}/{field}")
    }

    /// Write one field.
    pub async fn put<T: Serialize>(hash: &str, field: &str, value: &T) -> Result<(), StoreError> {
        let db = get_db()?;
        let record = HashRecord {
            id: None,
            hash: hash.to_string(),
            field: field.to_string(),
            value: serde_json::to_value(value)?,
        };
        let _: Option<HashRecord> = db
            .upsert(("hash_entry", Self::entry_id(hash, field)))
            .content(record)
            .await?;
        Ok(())
    }

    /// Read one field.
    pub async fn get<T: DeserializeOwned>(hash: &str, field: &str) -> Result<Option<T>, StoreError> {
        let db = get_db()?;
        let record: Option<HashRecord> =
            db.select(("hash_entry", Self::entry_id(hash, field))).await?;
        record
            .map(|r| serde_json::from_value(r.value).map_err(StoreError::from))
            .transpose()
    }

    /// Read every field of a hash.
    pub async fn all<T: DeserializeOwned>(hash: &str) -> Result<HashMap<String, T>, StoreError> {
        let db = get_db()?;
        let mut response = db
            .query("SELECT * FROM hash_entry WHERE hash = $hash")
            .bind(("hash", hash.to_string()))
            .await?;
        let records: Vec<HashRecord> = response.take(0)?;
        records
            .into_iter()
            .map(|r| {
                serde_json::from_value(r.value)
                    .map(|v| (r.field, v))
                    .map_err(StoreError::from)
            })
            .collect()
    }

    /// Remove one field.
    pub async fn delete(hash: &str, field: &str) -> Result<(), StoreError> {
        let db = get_db()?;
        let _: Option<HashRecord> =
            db.delete(("hash_entry", Self::entry_id(hash, field))).await?;
        Ok(())
    }

    /// Remove every field of a hash.
    pub async fn clear(hash: &str) -> Result<(), StoreError> {
        let db = get_db()?;
        db.query("DELETE FROM hash_entry WHERE hash = $hash")
            .bind(("hash", hash.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
