//! Character registry: deduplicated, usage-ranked speaker records.
//!
//! Characters are created on explicit save and never auto-deleted. Scenes
//! reference speakers by display name only; deleting a character removes
//! the registry record and nothing else.

use crate::storage::{unix_now, KvStore, StorageError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const CHARACTERS_KEY: &str = "characters";

/// Fixed palette of per-character colors, warm anime tones.
const PALETTE: [&str; 8] = [
    "#ff6b9d", "#c77dff", "#4cc9f0", "#ffd60a", "#ff9770", "#6a994e", "#ff5a5f", "#a663cc",
];

/// Unique identifier for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A saved character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,

    /// Display name; exact-match deduplication key.
    pub name: String,

    /// Inline avatar payload, if one was supplied.
    pub avatar: Option<String>,

    /// Stable per-character color from the palette.
    pub color: String,

    /// How often this character has been selected for a scene.
    pub usage_count: u32,

    /// Creation time, unix seconds.
    pub created_at: u64,
}

/// The character registry.
pub struct CharacterRegistry {
    characters: Vec<Character>,
    kv: KvStore,
}

impl CharacterRegistry {
    /// Open the registry, loading the persisted list or starting empty.
    pub async fn open(kv: KvStore) -> Result<Self, StorageError> {
        let characters = kv
            .get::<Vec<Character>>(CHARACTERS_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self { characters, kv })
    }

    /// Save a character by name.
    ///
    /// Re-adding an existing name is treated as "use again": the usage
    /// count is bumped and the avatar is overwritten only when a new one is
    /// supplied. A blank name is a no-op returning `None`.
    pub fn add_character(&mut self, name: &str, avatar: Option<String>) -> Option<&Character> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some(pos) = self.characters.iter().position(|c| c.name == name) {
            let existing = &mut self.characters[pos];
            existing.usage_count += 1;
            if let Some(avatar) = avatar {
                existing.avatar = Some(avatar);
            }
            return self.characters.get(pos);
        }

        self.characters.push(Character {
            id: CharacterId::new(),
            name: name.to_string(),
            avatar,
            color: random_color(),
            usage_count: 1,
            created_at: unix_now(),
        });
        self.characters.last()
    }

    /// Remove a character by id. Idempotent.
    pub fn delete_character(&mut self, id: &CharacterId) {
        self.characters.retain(|c| c.id != *id);
    }

    /// Bump the usage count; called when a character is selected for a
    /// scene.
    pub fn update_usage(&mut self, id: &CharacterId) {
        if let Some(character) = self.characters.iter_mut().find(|c| c.id == *id) {
            character.usage_count += 1;
        }
    }

    /// Look up a character by id.
    pub fn get(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == *id)
    }

    /// All characters in insertion order.
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// All characters ordered by usage count descending, insertion order as
    /// tiebreak.
    pub fn sorted_characters(&self) -> Vec<&Character> {
        let mut sorted: Vec<&Character> = self.characters.iter().collect();
        sorted.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        sorted
    }

    /// Persist the registry.
    pub async fn save(&self) -> Result<(), StorageError> {
        self.kv.put(CHARACTERS_KEY, &self.characters).await
    }
}

fn random_color() -> String {
    let mut rng = rand::thread_rng();
    PALETTE[rng.gen_range(0..PALETTE.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_registry(dir: &TempDir) -> CharacterRegistry {
        let kv = KvStore::open(dir.path()).await.unwrap();
        CharacterRegistry::open(kv).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_character() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        let character = registry.add_character("Rin", None).unwrap();
        assert_eq!(character.name, "Rin");
        assert_eq!(character.usage_count, 1);
        assert!(PALETTE.contains(&character.color.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_name_bumps_usage_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        registry.add_character("Rin", None);
        let again = registry.add_character("Rin", None).unwrap();

        assert_eq!(again.usage_count, 2);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_readd_overwrites_avatar_only_when_supplied() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        registry.add_character("Rin", Some("data:avatar-v1".to_string()));
        registry.add_character("Rin", None);
        assert_eq!(
            registry.characters()[0].avatar.as_deref(),
            Some("data:avatar-v1")
        );

        registry.add_character("Rin", Some("data:avatar-v2".to_string()));
        assert_eq!(
            registry.characters()[0].avatar.as_deref(),
            Some("data:avatar-v2")
        );
    }

    #[tokio::test]
    async fn test_blank_name_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        assert!(registry.add_character("   ", None).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_name_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        registry.add_character("  Rin  ", None);
        let again = registry.add_character("Rin", None).unwrap();
        assert_eq!(again.usage_count, 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        let id = registry.add_character("Rin", None).unwrap().id;
        registry.delete_character(&id);
        registry.delete_character(&id);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_sorted_by_usage_with_insertion_tiebreak() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_registry(&dir).await;

        registry.add_character("Rin", None);
        registry.add_character("Aoi", None);
        registry.add_character("Yuu", None);

        let aoi = registry.characters()[1].id;
        registry.update_usage(&aoi);
        registry.update_usage(&aoi);

        let names: Vec<&str> = registry
            .sorted_characters()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Aoi", "Rin", "Yuu"]);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        {
            let mut registry = open_registry(&dir).await;
            registry.add_character("Rin", None);
            registry.save().await.unwrap();
        }

        let reopened = open_registry(&dir).await;
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.characters()[0].name, "Rin");
    }
}
