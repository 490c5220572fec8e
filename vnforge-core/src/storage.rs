//! Key-value document persistence.
//!
//! The lightweight half of the hybrid store: each logical key is one JSON
//! file under a root directory. Large payloads never land here; they go
//! through [`crate::objects`] and are referenced from the documents.
//!
//! Writes can be bounded by a byte quota. A rejected write leaves the
//! previous file intact and never touches in-memory state, so callers keep
//! working for the session and only lose durability.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage quota exceeded writing '{key}': {size} bytes against a quota of {quota}")]
    QuotaExceeded { key: String, size: u64, quota: u64 },
}

impl StorageError {
    /// Whether this is the durability-only quota condition.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// JSON document store, one file per key.
#[derive(Debug, Clone)]
pub struct KvStore {
    root: PathBuf,
    quota: Option<u64>,
}

impl KvStore {
    /// Open a store rooted at a directory, creating it if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, quota: None })
    }

    /// Bound every write to at most `bytes` of serialized JSON.
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Read a document. An absent file reads as `None`, like a cold profile.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a document, replacing any previous value for the key.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(value)?;
        if let Some(quota) = self.quota {
            let size = content.len() as u64;
            if size > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    size,
                    quota,
                });
            }
        }
        fs::write(self.path_for(key), content).await?;
        Ok(())
    }

    /// Delete a document. Absent keys are a no-op.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Current UTC day ordinal (days since the unix epoch).
pub(crate) fn today() -> i64 {
    (unix_now() / 86_400) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        value: String,
    }

    #[tokio::test]
    async fn test_get_absent_key_is_none() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path()).await.unwrap();
        let doc: Option<Doc> = kv.get("missing").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path()).await.unwrap();

        let doc = Doc {
            value: "hello".to_string(),
        };
        kv.put("doc", &doc).await.unwrap();

        let loaded: Doc = kv.get("doc").await.unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_quota_rejects_oversized_write_and_keeps_old_file() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path()).await.unwrap().with_quota(128);

        kv.put(
            "doc",
            &Doc {
                value: "small".to_string(),
            },
        )
        .await
        .unwrap();

        let err = kv
            .put(
                "doc",
                &Doc {
                    value: "x".repeat(1024),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_quota());

        // The previous document survives the rejected write.
        let loaded: Doc = kv.get("doc").await.unwrap().unwrap();
        assert_eq!(loaded.value, "small");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path()).await.unwrap();
        kv.remove("never-written").await.unwrap();
    }
}
