//! The scene store: owned document state plus hybrid persistence.
//!
//! Wraps a [`SceneDocument`] with the two storage halves: the lightweight
//! JSON document goes to the key-value store, inline image payloads are
//! externalized to the binary object store and replaced by references.
//! Resolution rehydrates references through a process-wide, append-only
//! image cache.

use crate::document::{
    Background, Mode, ResolvedScene, Scene, SceneDocument, SceneId, SceneUpdate,
};
use crate::objects::{ObjectStore, ObjectStoreError, Partition, StoredObject};
use crate::storage::{KvStore, StorageError};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

const SCENES_KEY: &str = "scenes";

/// Errors from scene store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("object store error: {0}")]
    Objects(#[from] ObjectStoreError),
}

impl StoreError {
    /// Whether the failure is the durability-only quota condition.
    ///
    /// In-memory state is intact either way; quota failures additionally
    /// leave the session fully usable and only lose persistence.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_quota())
    }
}

/// The scene store.
///
/// A single long-lived instance owned by the host; all mutation entry
/// points are synchronous on the in-memory document, with [`Self::save`]
/// as the explicit durability hook.
pub struct SceneStore {
    doc: SceneDocument,
    kv: KvStore,
    objects: ObjectStore,
    /// Append-only map from store-ref id to resolved payload. Never
    /// invalidated: payloads are immutable once written.
    image_cache: HashMap<String, Background>,
}

impl SceneStore {
    /// Open the store, loading the persisted document or bootstrapping a
    /// fresh one.
    pub async fn open(kv: KvStore, objects: ObjectStore) -> Result<Self, StoreError> {
        let doc = kv
            .get::<SceneDocument>(SCENES_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self {
            doc,
            kv,
            objects,
            image_cache: HashMap::new(),
        })
    }

    // ------------------------------------------------------------------
    // Mutation entry points
    // ------------------------------------------------------------------

    /// Append a scene with the default-inherit policy; cursor moves to it.
    pub fn add_scene(&mut self) -> SceneId {
        self.doc.add_scene()
    }

    /// Delete a scene by id. See [`SceneDocument::delete_scene`].
    pub fn delete_scene(&mut self, id: &SceneId) {
        self.doc.delete_scene(id);
    }

    /// Move a scene between positions. See [`SceneDocument::move_scene`].
    pub fn move_scene(&mut self, from: usize, to: usize) {
        self.doc.move_scene(from, to);
    }

    /// Merge a partial update into the scene under the cursor.
    pub fn update_current_scene(&mut self, update: SceneUpdate) {
        self.doc.update_current(update);
    }

    /// Move the cursor, clamped into range.
    pub fn set_current_index(&mut self, index: usize) {
        self.doc.set_current_index(index);
    }

    /// Advance the cursor, cycling past the end.
    pub fn advance_scene(&mut self) {
        self.doc.advance();
    }

    /// Switch editor mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.doc.set_mode(mode);
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// The underlying document.
    pub fn document(&self) -> &SceneDocument {
        &self.doc
    }

    /// All scenes in display order.
    pub fn scenes(&self) -> &[Scene] {
        &self.doc.scenes
    }

    /// Cursor position.
    pub fn current_index(&self) -> usize {
        self.doc.current_index
    }

    /// Current editor mode.
    pub fn mode(&self) -> Mode {
        self.doc.mode
    }

    /// Effective values for the scene at `index`, with a cached payload
    /// substituted for a resolved store reference.
    ///
    /// On a cache miss the reference is returned as-is; call
    /// [`Self::hydrate`] and resolve again.
    pub fn resolved_scene(&self, index: usize) -> Option<ResolvedScene> {
        let mut resolved = self.doc.resolved(index)?;

        if let Some(id) = resolved.background.as_ref().and_then(Background::ref_id) {
            if let Some(cached) = self.image_cache.get(id) {
                resolved.background = Some(cached.clone());
            }
        }

        Some(resolved)
    }

    /// Effective values for the scene under the cursor.
    pub fn current_resolved(&self) -> Option<ResolvedScene> {
        self.resolved_scene(self.doc.current_index)
    }

    /// Transcript of all scenes, handed to the AI collaborator as context.
    pub fn transcript(&self) -> String {
        self.doc.transcript()
    }

    /// Cached payload for a store-ref id, if hydrated.
    pub fn cached_background(&self, id: &str) -> Option<&Background> {
        self.image_cache.get(id)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Fetch every referenced-but-uncached background payload into the
    /// image cache.
    ///
    /// Individual read failures are logged and skipped; one unreadable
    /// record must not block the rest of the document.
    pub async fn hydrate(&mut self) -> Result<(), StoreError> {
        let ids: Vec<String> = self
            .doc
            .scenes
            .iter()
            .filter_map(|s| s.background.as_ref().and_then(Background::ref_id))
            .filter(|id| !self.image_cache.contains_key(*id))
            .map(str::to_string)
            .collect();

        for id in ids {
            match self.objects.get(Partition::Images, &id).await {
                Ok(Some(object)) => {
                    if let Some(background) = background_from_object(&id, object) {
                        self.image_cache.insert(id, background);
                    }
                }
                Ok(None) => warn!(id = %id, "referenced background missing from object store"),
                Err(e) => warn!(id = %id, error = %e, "failed to load background"),
            }
        }

        Ok(())
    }

    /// Externalize inline payloads, then persist the lightweight document.
    ///
    /// A quota failure surfaces as [`StoreError::is_quota`]; the in-memory
    /// document stays usable for the session either way.
    pub async fn save(&mut self) -> Result<(), StoreError> {
        self.externalize_backgrounds().await?;
        self.kv.put(SCENES_KEY, &self.doc).await?;
        Ok(())
    }

    /// Replace every inline background with an object-store reference under
    /// a key derived from the scene id. Idempotent: references and external
    /// URLs pass through untouched.
    async fn externalize_backgrounds(&mut self) -> Result<(), StoreError> {
        for scene in &mut self.doc.scenes {
            let Some(Background::Inline { data }) = &scene.background else {
                continue;
            };

            let id = format!("scene_bg_{}", scene.id);
            let payload = data.clone().into_bytes();
            self.objects
                .put(Partition::Images, &id, &StoredObject::blob(payload))
                .await?;

            // Prime the cache so the next resolution does not miss.
            self.image_cache
                .insert(id.clone(), Background::inline(data.clone()));
            scene.background = Some(Background::store_ref(id));
        }
        Ok(())
    }
}

/// Convert a stored record back to a displayable background.
fn background_from_object(id: &str, object: StoredObject) -> Option<Background> {
    match object {
        StoredObject::Url { value } => Some(Background::external(value)),
        StoredObject::Blob { payload, .. } => match String::from_utf8(payload) {
            Ok(data) => Some(Background::inline(data)),
            Err(_) => {
                warn!(id = %id, "stored background payload is not valid UTF-8");
                None
            }
        },
    }
}
