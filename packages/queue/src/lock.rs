//! Distributed named mutexes over the shared store.
//!
//! A lock is a keyed value at `lock:<resource>` created with
//! create-if-absent semantics and a TTL, so a crashed holder frees the
//! resource on expiry. Release verifies the caller's token with a
//! compare-and-delete, which makes releasing a lock that expired and was
//! re-acquired by someone else a harmless no-op.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};
use ulid::Ulid;

use indexer_core::keys;
use store::Kv;

use crate::QueueError;

/// Tuning for lock acquisition.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// How long an acquired lock lives before the store reclaims it.
    pub ttl: Duration,
    /// Pause between acquisition attempts.
    pub retry_delay: Duration,
    /// Attempts beyond the first before giving up.
    pub max_retries: u32,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            retry_delay: Duration::from_millis(100),
            max_retries: 10,
        }
    }
}

/// Opaque proof of lock ownership, required for release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct LockManager {
    opts: LockOptions,
}

impl LockManager {
    pub fn new(opts: LockOptions) -> Self {
        Self { opts }
    }

    /// Try to take the lock, retrying with a fixed delay. `Ok(None)` means
    /// every attempt found the lock held; that is a normal outcome, not an
    /// error.
    pub async fn acquire(&self, resource: &str) -> Result<Option<LockToken>, QueueError> {
        let key = keys::lock_key(resource);
        let token = LockToken::generate();

        for attempt in 0..=self.opts.max_retries {
            if Kv::put_nx(&key, &token.0, Some(self.opts.ttl)).await? {
                debug!(resource, attempt, "lock acquired");
                return Ok(Some(token));
            }
            if attempt < self.opts.max_retries {
                tokio::time::sleep(self.opts.retry_delay).await;
            }
        }

        debug!(resource, "lock unavailable after retries");
        Ok(None)
    }

    /// Release a held lock. Returns false when the stored token no longer
    /// matches, meaning the lock expired and may have a new owner.
    pub async fn release(&self, resource: &str, token: &LockToken) -> Result<bool, QueueError> {
        let released = Kv::delete_if_eq(&keys::lock_key(resource), &token.0).await?;
        if !released {
            warn!(resource, "lock token mismatch on release; lock likely expired");
        }
        Ok(released)
    }

    /// Run `f` under the lock, releasing it whatever `f` returns. `Ok(None)`
    /// means the lock could not be acquired and `f` never ran.
    pub async fn with_lock<T, F, Fut>(
        &self,
        resource: &str,
        f: F,
    ) -> Result<Option<T>, QueueError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueueError>>,
    {
        let Some(token) = self.acquire(resource).await? else {
            return Ok(None);
        };

        let result = f().await;

        // Never let a release failure mask the critical section's outcome.
        if let Err(e) = self.release(resource, &token).await {
            warn!(resource, error = %e, "failed to release lock");
        }

        result.map(Some)
    }
}
