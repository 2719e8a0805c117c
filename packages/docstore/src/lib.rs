//! Object storage for uploaded documents.
//!
//! Jobs carry a `storage_path`; workers fetch the document text from here
//! before chunking. Backends:
//! - On-disk storage for deployments
//! - In-memory storage for tests
//!
//! Implementation note:
//! This is intentionally a small wrapper around `object_store`, which
//! already provides local filesystem and in-memory backends.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use object_store::ObjectStore;
use object_store::ObjectStoreExt;
use object_store::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DocStoreError {
    #[error("invalid docstore config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object_store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("document at {path} is not valid UTF-8")]
    NotText { path: String },
}

impl DocStoreError {
    /// Whether retrying the fetch could possibly succeed. A missing or
    /// non-text document will stay that way.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            DocStoreError::NotText { .. }
                | DocStoreError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStoreKind {
    Filesystem,
    Memory,
}

impl DocStoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocStoreKind::Filesystem => "filesystem",
            DocStoreKind::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub enum DocStoreConfig {
    Filesystem { root: PathBuf },
    Memory,
}

impl DocStoreConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self::Filesystem { root: root.into() }
    }

    /// Build a config from environment variables.
    ///
    /// - `DOCSTORE_BACKEND`: `filesystem` (default) or `memory`
    /// - `DOCSTORE_FS_ROOT`: filesystem root (default `./data/documents`)
    pub fn from_env() -> Result<Self, DocStoreError> {
        let backend = std::env::var("DOCSTORE_BACKEND").ok();
        match backend.as_deref() {
            Some("memory") | Some("mem") => Ok(Self::memory()),
            Some("filesystem") | Some("fs") | None => {
                let root = std::env::var("DOCSTORE_FS_ROOT")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/documents"));
                Ok(Self::filesystem(root))
            }
            Some(other) => Err(DocStoreError::InvalidConfig(format!(
                "unsupported DOCSTORE_BACKEND={other} (expected filesystem|memory)"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct DocStore {
    kind: DocStoreKind,
    store: Arc<dyn ObjectStore>,
}

impl DocStore {
    pub fn kind(&self) -> DocStoreKind {
        self.kind
    }

    pub async fn new(cfg: DocStoreConfig) -> Result<Self, DocStoreError> {
        let (kind, store) = match cfg {
            DocStoreConfig::Filesystem { root } => {
                ensure_dir(&root)?;
                let fs = object_store::local::LocalFileSystem::new_with_prefix(&root)?;
                (DocStoreKind::Filesystem, Arc::new(fs) as _)
            }
            DocStoreConfig::Memory => {
                let mem = object_store::memory::InMemory::new();
                (DocStoreKind::Memory, Arc::new(mem) as _)
            }
        };

        Ok(Self { kind, store })
    }

    pub async fn from_env() -> Result<Self, DocStoreError> {
        Self::new(DocStoreConfig::from_env()?).await
    }

    fn to_path(key: &str) -> Result<Path, DocStoreError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(DocStoreError::InvalidConfig(
                "storage path must not be empty".to_string(),
            ));
        }
        Ok(Path::from(key))
    }

    pub async fn put_bytes(&self, key: &str, bytes: Bytes) -> Result<(), DocStoreError> {
        let path = Self::to_path(key)?;
        self.store
            .put(&path, object_store::PutPayload::from(bytes))
            .await?;
        Ok(())
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Bytes, DocStoreError> {
        let path = Self::to_path(key)?;
        let res = self.store.get(&path).await?;
        Ok(res.bytes().await?)
    }

    /// Store a document's text body.
    pub async fn put_text(&self, key: &str, text: &str) -> Result<(), DocStoreError> {
        self.put_bytes(key, Bytes::copy_from_slice(text.as_bytes()))
            .await
    }

    /// Fetch a document's text body for chunking.
    pub async fn fetch_text(&self, key: &str) -> Result<String, DocStoreError> {
        let bytes = self.get_bytes(key).await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DocStoreError::NotText {
            path: key.to_string(),
        })
    }

    pub async fn delete(&self, key: &str) -> Result<(), DocStoreError> {
        let path = Self::to_path(key)?;
        self.store.delete(&path).await?;
        Ok(())
    }
}

fn ensure_dir(root: &FsPath) -> Result<(), DocStoreError> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_text_round_trip() -> Result<(), DocStoreError> {
        let store = DocStore::new(DocStoreConfig::memory()).await?;
        store.put_text("uploads/a.txt", "paragraph one\n\nparagraph two").await?;
        let got = store.fetch_text("uploads/a.txt").await?;
        assert_eq!(got, "paragraph one\n\nparagraph two");
        Ok(())
    }

    #[tokio::test]
    async fn filesystem_text_round_trip() -> Result<(), DocStoreError> {
        let dir = tempfile::tempdir()?;
        let store = DocStore::new(DocStoreConfig::filesystem(dir.path())).await?;

        store.put_text("nested/doc.txt", "hello from disk").await?;
        assert_eq!(store.fetch_text("nested/doc.txt").await?, "hello from disk");

        store.delete("nested/doc.txt").await?;
        let err = store.fetch_text("nested/doc.txt").await.unwrap_err();
        assert!(err.is_permanent());
        Ok(())
    }

    #[tokio::test]
    async fn non_utf8_documents_are_rejected() -> Result<(), DocStoreError> {
        let store = DocStore::new(DocStoreConfig::memory()).await?;
        store
            .put_bytes("uploads/blob.bin", Bytes::from_static(&[0xff, 0xfe, 0x00]))
            .await?;
        let err = store.fetch_text("uploads/blob.bin").await.unwrap_err();
        assert!(matches!(err, DocStoreError::NotText { .. }));
        assert!(err.is_permanent());
        Ok(())
    }
}
