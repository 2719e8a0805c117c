use thiserror::Error;

use store::StoreError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("could not acquire lock on {0}")]
    LockUnavailable(String),
}
