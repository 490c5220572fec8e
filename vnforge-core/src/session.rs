//! StudioSession - the primary public API for the scene editor.
//!
//! Ties the scene store, character registry, and achievement tracker
//! together behind one handle, and wires the cross-store side effects: stat
//! counters follow mutations, collaborator results land in the current
//! scene, screenshots feed the gallery. Each store is a single long-lived
//! owned instance injected here, not a global.

use crate::achievements::{AchievementTracker, StatsUpdate};
use crate::ai::AiConfig;
use crate::characters::{Character, CharacterId, CharacterRegistry};
use crate::document::{Background, SceneUpdate};
use crate::objects::{ObjectStore, ObjectStoreError, Screenshot};
use crate::storage::{KvStore, StorageError};
use crate::store::{SceneStore, StoreError};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("object store error: {0}")]
    Objects(#[from] ObjectStoreError),

    #[error("scene store error: {0}")]
    Store(#[from] StoreError),
}

/// An editing session over one local data directory.
///
/// No error surfaced here is fatal: a failed feature degrades alone and the
/// rest of the document stays usable. User-facing failures land on a shared
/// error slot, cleared by the next successful collaborator call or by
/// explicit dismissal.
pub struct StudioSession {
    scenes: SceneStore,
    characters: CharacterRegistry,
    achievements: AchievementTracker,
    objects: ObjectStore,
    ai_config: AiConfig,
    kv: KvStore,
    last_error: Option<String>,
}

impl StudioSession {
    /// Open a session rooted at a data directory.
    ///
    /// `<root>/store` holds the lightweight JSON documents, `<root>/objects`
    /// the binary object store.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, SessionError> {
        let root = root.as_ref();
        let kv = KvStore::open(root.join("store")).await?;
        let objects = ObjectStore::open(root.join("objects")).await?;

        let scenes = SceneStore::open(kv.clone(), objects.clone()).await?;
        let characters = CharacterRegistry::open(kv.clone()).await?;
        let achievements = AchievementTracker::open(kv.clone()).await?;
        let ai_config = AiConfig::load(&kv).await?;

        let mut session = Self {
            scenes,
            characters,
            achievements,
            objects,
            ai_config,
            kv,
            last_error: None,
        };
        session.scenes.hydrate().await?;
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Store access
    // ------------------------------------------------------------------

    pub fn scenes(&self) -> &SceneStore {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneStore {
        &mut self.scenes
    }

    pub fn characters(&self) -> &CharacterRegistry {
        &self.characters
    }

    pub fn characters_mut(&mut self) -> &mut CharacterRegistry {
        &mut self.characters
    }

    pub fn achievements(&self) -> &AchievementTracker {
        &self.achievements
    }

    pub fn achievements_mut(&mut self) -> &mut AchievementTracker {
        &mut self.achievements
    }

    pub fn ai_config(&self) -> &AiConfig {
        &self.ai_config
    }

    pub fn set_ai_config(&mut self, config: AiConfig) {
        self.ai_config = config;
    }

    // ------------------------------------------------------------------
    // Collaborator results
    // ------------------------------------------------------------------

    /// Apply the AI collaborator's dialogue result to the current scene.
    ///
    /// Success sets the text, counts the generation, and clears the error
    /// slot. Failure records the message and leaves scene state untouched.
    pub fn apply_generated_text(&mut self, result: Result<String, String>) {
        match result {
            Ok(text) => {
                self.scenes
                    .update_current_scene(SceneUpdate::default().with_text(text.clone()));
                self.count_generation();
                self.record_dialogue(&text);
                self.achievements.check_achievements();
                self.last_error = None;
            }
            Err(message) => self.last_error = Some(message),
        }
    }

    /// Apply the AI collaborator's background result to the current scene.
    pub fn apply_generated_background(&mut self, result: Result<Background, String>) {
        match result {
            Ok(background) => {
                self.scenes
                    .update_current_scene(SceneUpdate::default().with_background(background));
                self.count_generation();
                self.achievements.check_achievements();
                self.last_error = None;
            }
            Err(message) => self.last_error = Some(message),
        }
    }

    fn count_generation(&mut self) {
        let generations = self.achievements.stats().ai_generations + 1;
        self.achievements
            .update_stats(StatsUpdate::default().ai_generations(generations));
    }

    // ------------------------------------------------------------------
    // Stat wiring
    // ------------------------------------------------------------------

    /// Track the longest dialogue line. Only larger values are sent to the
    /// tracker; it performs a plain merge, not a max-reduction.
    pub fn record_dialogue(&mut self, text: &str) {
        let length = text.chars().count() as u32;
        if length > self.achievements.stats().longest_text {
            self.achievements
                .update_stats(StatsUpdate::default().longest_text(length));
            self.achievements.check_achievements();
        }
    }

    /// Refresh the scene counter from the document and evaluate unlocks.
    /// Call after scene list mutations.
    pub fn sync_scene_stats(&mut self) {
        let count = self.scenes.scenes().len() as u32;
        self.achievements
            .update_stats(StatsUpdate::default().scenes(count));
        self.achievements.check_achievements();
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Save a character and sync the creation counter.
    ///
    /// Blank names are rejected before any side effect.
    pub fn save_character(&mut self, name: &str, avatar: Option<String>) -> Option<Character> {
        let saved = self.characters.add_character(name, avatar)?.clone();
        let count = self.characters.len() as u32;
        self.achievements
            .update_stats(StatsUpdate::default().characters(count));
        self.achievements.check_achievements();
        Some(saved)
    }

    /// Select a character as the current scene's speaker, bumping its usage
    /// count. Unknown ids are a no-op.
    pub fn select_character(&mut self, id: &CharacterId) {
        let Some(name) = self.characters.get(id).map(|c| c.name.clone()) else {
            return;
        };
        self.characters.update_usage(id);
        self.scenes
            .update_current_scene(SceneUpdate::default().with_character(name));
    }

    // ------------------------------------------------------------------
    // Screenshots
    // ------------------------------------------------------------------

    /// Store a captured screenshot and count it.
    ///
    /// An I/O failure skips the gallery entry and the counter, records the
    /// error, and leaves everything else usable.
    pub async fn capture_screenshot(&mut self, id: &str, payload: Vec<u8>) {
        match self.objects.save_screenshot(id, payload).await {
            Ok(()) => {
                let count = self.achievements.stats().total_screenshots + 1;
                self.achievements
                    .update_stats(StatsUpdate::default().screenshots(count));
                self.achievements.check_achievements();
            }
            Err(e) => {
                warn!(id = %id, error = %e, "screenshot not added to gallery");
                self.last_error = Some(format!("failed to save screenshot: {e}"));
            }
        }
    }

    /// All screenshots, newest first.
    pub async fn screenshots(&self) -> Result<Vec<Screenshot>, SessionError> {
        Ok(self.objects.all_screenshots().await?)
    }

    /// Remove a screenshot from the gallery.
    pub async fn delete_screenshot(&mut self, id: &str) -> Result<(), SessionError> {
        Ok(self.objects.delete_screenshot(id).await?)
    }

    // ------------------------------------------------------------------
    // Persistence and errors
    // ------------------------------------------------------------------

    /// Persist every store.
    ///
    /// Quota failures are recorded on the error slot and swallowed: the
    /// session keeps its in-memory state and only loses durability. Other
    /// I/O failures propagate.
    pub async fn persist(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.scenes.save().await {
            if !e.is_quota() {
                return Err(e.into());
            }
            self.note_quota(&e);
        }
        if let Err(e) = self.characters.save().await {
            if !e.is_quota() {
                return Err(e.into());
            }
            self.note_quota(&e);
        }
        if let Err(e) = self.achievements.save().await {
            if !e.is_quota() {
                return Err(e.into());
            }
            self.note_quota(&e);
        }
        if let Err(e) = self.ai_config.save(&self.kv).await {
            if !e.is_quota() {
                return Err(e.into());
            }
            self.note_quota(&e);
        }
        Ok(())
    }

    fn note_quota(&mut self, e: &dyn std::fmt::Display) {
        warn!(error = %e, "durability write rejected; keeping in-memory state");
        self.last_error = Some(format!("{e}"));
    }

    /// The most recent user-facing failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Dismiss the error slot.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generated_text_lands_in_current_scene() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        session.apply_generated_text(Ok("A dramatic line!".to_string()));

        let resolved = session.scenes().current_resolved().unwrap();
        assert_eq!(resolved.text.as_deref(), Some("A dramatic line!"));
        assert_eq!(session.achievements().stats().ai_generations, 1);
        assert!(session.achievements().is_unlocked("use_ai"));
    }

    #[tokio::test]
    async fn test_collaborator_failure_fills_error_slot_only() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        let before = session.scenes().current_resolved().unwrap();
        session.apply_generated_text(Err("rate limited".to_string()));

        assert_eq!(session.last_error(), Some("rate limited"));
        assert_eq!(session.scenes().current_resolved().unwrap(), before);
        assert_eq!(session.achievements().stats().ai_generations, 0);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        session.apply_generated_text(Err("rate limited".to_string()));
        session.apply_generated_text(Ok("recovered".to_string()));
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_save_character_syncs_stats() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        session.save_character("Rin", None);
        session.save_character("Aoi", None);
        session.save_character("Yuu", None);

        assert_eq!(session.achievements().stats().characters_created, 3);
        assert!(session.achievements().is_unlocked("character_creator"));
    }

    #[tokio::test]
    async fn test_select_character_sets_speaker_and_usage() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        let id = session.save_character("Rin", None).unwrap().id;
        session.select_character(&id);

        assert_eq!(
            session.scenes().document().current().character.as_deref(),
            Some("Rin")
        );
        assert_eq!(session.characters().get(&id).unwrap().usage_count, 2);
    }

    #[tokio::test]
    async fn test_capture_screenshot_counts_and_lists() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        session.capture_screenshot("1700000000000", vec![1, 2, 3]).await;

        assert_eq!(session.achievements().stats().total_screenshots, 1);
        let shots = session.screenshots().await.unwrap();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_record_dialogue_keeps_maximum() {
        let dir = TempDir::new().unwrap();
        let mut session = StudioSession::open(dir.path()).await.unwrap();

        session.record_dialogue(&"x".repeat(600));
        session.record_dialogue("short");

        assert_eq!(session.achievements().stats().longest_text, 600);
        assert!(session.achievements().is_unlocked("wordsmith"));
    }

    #[tokio::test]
    async fn test_persist_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut session = StudioSession::open(dir.path()).await.unwrap();
            session.scenes_mut().add_scene();
            session.sync_scene_stats();
            session.save_character("Rin", None);
            session.persist().await.unwrap();
        }

        let session = StudioSession::open(dir.path()).await.unwrap();
        assert_eq!(session.scenes().scenes().len(), 2);
        assert_eq!(session.characters().len(), 1);
        assert_eq!(session.achievements().stats().total_scenes, 2);
    }
}
