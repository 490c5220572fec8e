//! Binary object store for large payloads.
//!
//! Scene backgrounds and screenshots stay out of the lightweight document
//! store; each record lives as one JSON file under a partition directory
//! and holds either raw payload bytes or a plain external URL, tagged so
//! retrieval knows which it has.
//!
//! Records survive independently of the scene list. Deleting a scene does
//! not delete its externalized background (see DESIGN.md on the accepted
//! leak); screenshots are deleted only through explicit calls.

use crate::storage::unix_now;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from object store operations.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Logical partition within the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Externalized scene backgrounds, keyed `scene_bg_<sceneId>`.
    Images,
    /// Captured screenshots, keyed by capture timestamp.
    Screenshots,
}

impl Partition {
    fn dir(self) -> &'static str {
        match self {
            Partition::Images => "images",
            Partition::Screenshots => "screenshots",
        }
    }
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoredObject {
    /// A plain external URL, returned verbatim on retrieval.
    Url { value: String },
    /// A raw binary payload.
    Blob { payload: Vec<u8>, timestamp: u64 },
}

impl StoredObject {
    /// Create a blob record stamped with the current time.
    pub fn blob(payload: Vec<u8>) -> Self {
        Self::Blob {
            payload,
            timestamp: unix_now(),
        }
    }

    /// Create a URL record.
    pub fn url(value: impl Into<String>) -> Self {
        Self::Url {
            value: value.into(),
        }
    }
}

/// A screenshot record returned from the gallery listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub id: String,
    pub payload: Vec<u8>,
    pub timestamp: u64,
}

/// File-backed binary object store with two partitions.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Open a store rooted at a directory, creating both partitions.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ObjectStoreError> {
        let root = root.as_ref().to_path_buf();
        for partition in [Partition::Images, Partition::Screenshots] {
            fs::create_dir_all(root.join(partition.dir())).await?;
        }
        Ok(Self { root })
    }

    /// Write a record, replacing any previous record under the same id.
    ///
    /// Payloads are treated as immutable once written; re-writing the same
    /// id is only done with identical content (idempotent externalization).
    pub async fn put(
        &self,
        partition: Partition,
        id: &str,
        object: &StoredObject,
    ) -> Result<(), ObjectStoreError> {
        let content = serde_json::to_vec(object)?;
        fs::write(self.path_for(partition, id), content).await?;
        Ok(())
    }

    /// Read a record by id.
    pub async fn get(
        &self,
        partition: Partition,
        id: &str,
    ) -> Result<Option<StoredObject>, ObjectStoreError> {
        match fs::read(self.path_for(partition, id)).await {
            Ok(content) => Ok(Some(serde_json::from_slice(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a record. Absent ids are a no-op.
    pub async fn delete(&self, partition: Partition, id: &str) -> Result<(), ObjectStoreError> {
        match fs::remove_file(self.path_for(partition, id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List every record in a partition as `(id, record)` pairs.
    pub async fn list(
        &self,
        partition: Partition,
    ) -> Result<Vec<(String, StoredObject)>, ObjectStoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(self.root.join(partition.dir())).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let content = fs::read(&path).await?;
                let object: StoredObject = serde_json::from_slice(&content)?;
                records.push((id.to_string(), object));
            }
        }

        Ok(records)
    }

    /// Store a captured screenshot blob.
    pub async fn save_screenshot(
        &self,
        id: &str,
        payload: Vec<u8>,
    ) -> Result<(), ObjectStoreError> {
        self.put(Partition::Screenshots, id, &StoredObject::blob(payload))
            .await
    }

    /// All screenshots in the gallery, newest first.
    pub async fn all_screenshots(&self) -> Result<Vec<Screenshot>, ObjectStoreError> {
        let mut screenshots: Vec<Screenshot> = self
            .list(Partition::Screenshots)
            .await?
            .into_iter()
            .filter_map(|(id, object)| match object {
                StoredObject::Blob { payload, timestamp } => Some(Screenshot {
                    id,
                    payload,
                    timestamp,
                }),
                StoredObject::Url { .. } => None,
            })
            .collect();

        screenshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(screenshots)
    }

    /// Remove a screenshot from the gallery.
    pub async fn delete_screenshot(&self, id: &str) -> Result<(), ObjectStoreError> {
        self.delete(Partition::Screenshots, id).await
    }

    fn path_for(&self, partition: Partition, id: &str) -> PathBuf {
        self.root
            .join(partition.dir())
            .join(format!("{}.json", sanitize(id)))
    }
}

/// Map an opaque id onto a filesystem-safe name.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_blob_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();

        let object = StoredObject::blob(vec![1, 2, 3, 255]);
        store.put(Partition::Images, "scene_bg_1", &object).await.unwrap();

        let loaded = store.get(Partition::Images, "scene_bg_1").await.unwrap();
        assert_eq!(loaded, Some(object));
    }

    #[tokio::test]
    async fn test_url_record_returns_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();

        store
            .put(
                Partition::Images,
                "bg",
                &StoredObject::url("https://img/bg.png"),
            )
            .await
            .unwrap();

        match store.get(Partition::Images, "bg").await.unwrap() {
            Some(StoredObject::Url { value }) => assert_eq!(value, "https://img/bg.png"),
            other => panic!("expected url record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get(Partition::Images, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();
        store.delete(Partition::Screenshots, "nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_partitions_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();

        store
            .put(Partition::Images, "shared_id", &StoredObject::blob(vec![1]))
            .await
            .unwrap();

        assert!(store
            .get(Partition::Screenshots, "shared_id")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_screenshots_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();

        for (id, ts) in [("a", 100), ("b", 300), ("c", 200)] {
            store
                .put(
                    Partition::Screenshots,
                    id,
                    &StoredObject::Blob {
                        payload: vec![0],
                        timestamp: ts,
                    },
                )
                .await
                .unwrap();
        }

        let shots = store.all_screenshots().await.unwrap();
        let ids: Vec<&str> = shots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_delete_screenshot_removes_from_gallery() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path()).await.unwrap();

        store.save_screenshot("shot_1", vec![9, 9]).await.unwrap();
        assert_eq!(store.all_screenshots().await.unwrap().len(), 1);

        store.delete_screenshot("shot_1").await.unwrap();
        assert!(store.all_screenshots().await.unwrap().is_empty());
    }

    #[test]
    fn test_sanitize_keeps_ids_stable() {
        assert_eq!(sanitize("scene_bg_abc-123"), "scene_bg_abc-123");
        assert_eq!(sanitize("../escape"), "___escape");
    }
}
