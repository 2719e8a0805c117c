//! Lock-guarded read-modify-write helpers.
//!
//! The store's list and hash primitives read and write whole values, so
//! any transform over them must run inside a critical section. These
//! helpers pair the read/transform/write sequence with the lock manager
//! so callers only supply the transform.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use store::{Hashes, Kv, Lists};

use crate::{LockManager, LockToken, QueueError};

#[derive(Debug, Clone, Default)]
pub struct AtomicOps {
    lock: LockManager,
}

impl AtomicOps {
    pub fn new(lock: LockManager) -> Self {
        Self { lock }
    }

    /// Write a new value under the key's lock and return the previous one.
    /// The outer `None` means the lock was unavailable and nothing changed;
    /// the inner `None` means the key had no prior value.
    pub async fn get_and_set<T>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<Option<Option<T>>, QueueError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.lock
            .with_lock(key, || async {
                let previous: Option<T> = Kv::get(key).await?;
                Kv::put(key, value, None).await?;
                Ok(previous)
            })
            .await
    }

    /// Increment a counter under its lock and return the new value.
    pub async fn increment(&self, key: &str, delta: i64) -> Result<Option<i64>, QueueError> {
        self.lock
            .with_lock(key, || async { Ok(Kv::incr(key, delta).await?) })
            .await
    }

    /// Transform a whole list under its lock. The transform returns the new
    /// list contents plus a value for the caller; `Ok(None)` means the lock
    /// was unavailable and nothing changed.
    pub async fn with_list<T, R, F, Fut>(&self, name: &str, f: F) -> Result<Option<R>, QueueError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Vec<T>) -> Fut,
        Fut: Future<Output = Result<(Vec<T>, R), QueueError>>,
    {
        self.lock
            .with_lock(name, || async {
                let items: Vec<T> = Lists::read(name).await?;
                let (items, out) = f(items).await?;
                Lists::write(name, &items).await?;
                Ok(out)
            })
            .await
    }

    /// Transform a whole hash under its lock, replacing its fields with the
    /// transform's output.
    pub async fn with_hash<T, R, F, Fut>(&self, name: &str, f: F) -> Result<Option<R>, QueueError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(std::collections::HashMap<String, T>) -> Fut,
        Fut: Future<Output = Result<(std::collections::HashMap<String, T>, R), QueueError>>,
    {
        self.lock
            .with_lock(name, || async {
                let fields = Hashes::all(name).await?;
                let (fields, out) = f(fields).await?;
                Hashes::clear(name).await?;
                for (field, value) in &fields {
                    Hashes::put(name, field, value).await?;
                }
                Ok(out)
            })
            .await
    }

    /// Run `f` holding the locks for every named key at once.
    ///
    /// Keys are locked in sorted order so two callers contending over
    /// overlapping sets cannot deadlock, and released in reverse. If any
    /// single lock cannot be taken, the ones already held are released and
    /// the whole operation reports `Ok(None)`.
    pub async fn with_multiple_keys<T, F, Fut>(
        &self,
        keys: &[&str],
        f: F,
    ) -> Result<Option<T>, QueueError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueueError>>,
    {
        let mut sorted: Vec<&str> = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut held = Vec::with_capacity(sorted.len());
        for key in &sorted {
            match self.lock.acquire(key).await {
                Ok(Some(token)) => held.push((*key, token)),
                Ok(None) => {
                    self.release_all(&mut held).await;
                    return Ok(None);
                }
                Err(e) => {
                    self.release_all(&mut held).await;
                    return Err(e);
                }
            }
        }

        let result = f().await;
        self.release_all(&mut held).await;
        result.map(Some)
    }

    async fn release_all(&self, held: &mut Vec<(&str, LockToken)>) {
        while let Some((key, token)) = held.pop() {
            if let Err(e) = self.lock.release(key, &token).await {
                warn!(resource = key, error = %e, "failed to release lock");
            }
        }
    }
}
