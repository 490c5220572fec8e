//! Scene document types and pure document logic.
//!
//! Contains the ordered scene list, the cursor, the edit mode, and the
//! inheritance-resolution algorithm. Persistence and image externalization
//! live in [`crate::store`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub Uuid);

impl SceneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Backgrounds
// ============================================================================

/// Where a scene background comes from.
///
/// The variant is decided at write time; nothing in this crate sniffs
/// string prefixes to guess what a background holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    /// Inline image payload (data URI), not yet externalized.
    Inline { data: String },
    /// Reference into the binary object store.
    StoreRef { id: String },
    /// Plain external URL, stored verbatim.
    External { url: String },
}

impl Background {
    /// Create an inline payload background.
    pub fn inline(data: impl Into<String>) -> Self {
        Self::Inline { data: data.into() }
    }

    /// Create an object-store reference background.
    pub fn store_ref(id: impl Into<String>) -> Self {
        Self::StoreRef { id: id.into() }
    }

    /// Create an external URL background.
    pub fn external(url: impl Into<String>) -> Self {
        Self::External { url: url.into() }
    }

    /// The store-ref id, if this background is a reference.
    pub fn ref_id(&self) -> Option<&str> {
        match self {
            Self::StoreRef { id } => Some(id),
            _ => None,
        }
    }
}

/// Editor mode.
///
/// `Simple` treats the document as a single scene; `Advanced` exposes the
/// full sequence and the advance-and-cycle control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Simple,
    Advanced,
}

// ============================================================================
// Scenes
// ============================================================================

/// One unit of dialogue: speaker, text, and background.
///
/// Each field carries an inherit flag; when set, the resolved value is read
/// from the nearest preceding scene with a concrete value for that field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,

    /// Position in the sequence. Dense: always equals the array index.
    pub order: usize,

    /// Speaker name.
    pub character: Option<String>,

    /// Dialogue text.
    pub text: Option<String>,

    /// Background image.
    pub background: Option<Background>,

    pub inherit_character: bool,
    pub inherit_text: bool,
    pub inherit_background: bool,
}

impl Scene {
    /// A scene appended by the user: same speaker, same location, new line.
    ///
    /// Dialogue is never silently inherited, so `text` starts as an empty
    /// concrete string while character and background inherit.
    fn appended(order: usize) -> Self {
        Self {
            id: SceneId::new(),
            order,
            character: None,
            text: Some(String::new()),
            background: None,
            inherit_character: true,
            inherit_text: false,
            inherit_background: true,
        }
    }

    /// The blank scene substituted when the last remaining scene is deleted.
    fn blank() -> Self {
        Self {
            id: SceneId::new(),
            order: 0,
            character: Some(String::new()),
            text: Some(String::new()),
            background: None,
            inherit_character: false,
            inherit_text: false,
            inherit_background: false,
        }
    }

    /// The greeting scene a fresh document starts with.
    fn greeting() -> Self {
        Self {
            id: SceneId::new(),
            order: 0,
            character: Some("???".to_string()),
            text: Some("Were you expecting something to happen?".to_string()),
            background: None,
            inherit_character: false,
            inherit_text: false,
            inherit_background: false,
        }
    }
}

/// Partial update applied to the scene under the cursor.
///
/// Setting a concrete value for a field also clears that field's inherit
/// flag; the coupling is enforced in [`SceneDocument::update_current`] so
/// call sites cannot forget it.
#[derive(Debug, Clone, Default)]
pub struct SceneUpdate {
    pub character: Option<String>,
    pub text: Option<String>,
    pub background: Option<Background>,
    pub inherit_character: Option<bool>,
    pub inherit_text: Option<bool>,
    pub inherit_background: Option<bool>,
}

impl SceneUpdate {
    /// Set the speaker name.
    pub fn with_character(mut self, name: impl Into<String>) -> Self {
        self.character = Some(name.into());
        self
    }

    /// Set the dialogue text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the background.
    pub fn with_background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// Toggle the character inherit flag explicitly.
    pub fn with_inherit_character(mut self, inherit: bool) -> Self {
        self.inherit_character = Some(inherit);
        self
    }

    /// Toggle the text inherit flag explicitly.
    pub fn with_inherit_text(mut self, inherit: bool) -> Self {
        self.inherit_text = Some(inherit);
        self
    }

    /// Toggle the background inherit flag explicitly.
    pub fn with_inherit_background(mut self, inherit: bool) -> Self {
        self.inherit_background = Some(inherit);
        self
    }
}

/// A scene's effective field values after applying inheritance.
///
/// A resolved background may still be a [`Background::StoreRef`] when the
/// payload has not been hydrated into the image cache yet; consumers render
/// again once it has.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScene {
    pub id: SceneId,
    pub index: usize,
    pub character: Option<String>,
    pub text: Option<String>,
    pub background: Option<Background>,
}

// ============================================================================
// Scene Document
// ============================================================================

/// The persisted aggregate: ordered scenes, cursor, and mode.
///
/// The scene list is never empty. Every mutation keeps `order` dense and the
/// cursor clamped into range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub scenes: Vec<Scene>,
    pub current_index: usize,
    pub mode: Mode,
}

impl SceneDocument {
    /// A fresh document with the greeting scene.
    pub fn new() -> Self {
        Self {
            scenes: vec![Scene::greeting()],
            current_index: 0,
            mode: Mode::Simple,
        }
    }

    /// The scene under the cursor.
    pub fn current(&self) -> &Scene {
        let index = self.current_index.min(self.scenes.len() - 1);
        &self.scenes[index]
    }

    /// Append a new scene with the default-inherit policy and move the
    /// cursor onto it.
    pub fn add_scene(&mut self) -> SceneId {
        let scene = Scene::appended(self.scenes.len());
        let id = scene.id;
        self.scenes.push(scene);
        self.current_index = self.scenes.len() - 1;
        id
    }

    /// Remove a scene by id. Unknown ids are a no-op. Deleting the last
    /// remaining scene substitutes a single blank scene at index 0.
    pub fn delete_scene(&mut self, id: &SceneId) {
        self.scenes.retain(|s| s.id != *id);
        if self.scenes.is_empty() {
            self.scenes.push(Scene::blank());
        }
        self.reindex();
        self.current_index = self.current_index.min(self.scenes.len() - 1);
    }

    /// Remove the scene at `from` and reinsert it at `to` (splice
    /// semantics), then move the cursor to `to`. Out-of-range indices are
    /// clamped.
    pub fn move_scene(&mut self, from: usize, to: usize) {
        let last = self.scenes.len() - 1;
        let from = from.min(last);
        let to = to.min(last);
        let scene = self.scenes.remove(from);
        self.scenes.insert(to, scene);
        self.reindex();
        self.current_index = to;
    }

    /// Merge a partial update into the scene under the cursor.
    ///
    /// Explicit inherit toggles apply first; a concrete value then clears
    /// the matching flag, so a value always means "stop inheriting".
    pub fn update_current(&mut self, update: SceneUpdate) {
        let index = self.current_index.min(self.scenes.len() - 1);
        let scene = &mut self.scenes[index];

        if let Some(inherit) = update.inherit_character {
            scene.inherit_character = inherit;
        }
        if let Some(inherit) = update.inherit_text {
            scene.inherit_text = inherit;
        }
        if let Some(inherit) = update.inherit_background {
            scene.inherit_background = inherit;
        }

        if let Some(character) = update.character {
            scene.character = Some(character);
            scene.inherit_character = false;
        }
        if let Some(text) = update.text {
            scene.text = Some(text);
            scene.inherit_text = false;
        }
        if let Some(background) = update.background {
            scene.background = Some(background);
            scene.inherit_background = false;
        }
    }

    /// Move the cursor, clamped into `[0, len - 1]`.
    pub fn set_current_index(&mut self, index: usize) {
        self.current_index = index.min(self.scenes.len() - 1);
    }

    /// Advance the cursor to the next scene, cycling past the end.
    pub fn advance(&mut self) {
        self.current_index = (self.current_index + 1) % self.scenes.len();
    }

    /// Switch editor mode. No side effects on scene contents.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Compute the effective values for the scene at `index`.
    ///
    /// For each field that is absent or marked inherit, scan backward for
    /// the nearest preceding scene with a concrete value; keep the scene's
    /// own value when none is found. Index 0 can never inherit.
    pub fn resolved(&self, index: usize) -> Option<ResolvedScene> {
        let scene = self.scenes.get(index)?;

        let character = if scene.inherit_character || scene.character.is_none() {
            scan_back(&self.scenes, index, |s| s.character.as_ref())
                .or(scene.character.as_ref())
                .cloned()
        } else {
            scene.character.clone()
        };

        let text = if scene.inherit_text || scene.text.is_none() {
            scan_back(&self.scenes, index, |s| s.text.as_ref())
                .or(scene.text.as_ref())
                .cloned()
        } else {
            scene.text.clone()
        };

        let background = if scene.inherit_background || scene.background.is_none() {
            scan_back(&self.scenes, index, |s| s.background.as_ref())
                .or(scene.background.as_ref())
                .cloned()
        } else {
            scene.background.clone()
        };

        Some(ResolvedScene {
            id: scene.id,
            index,
            character,
            text,
            background,
        })
    }

    /// Human-readable transcript of all scenes in order, used as
    /// conversation context for the AI collaborator.
    pub fn transcript(&self) -> String {
        (0..self.scenes.len())
            .filter_map(|i| self.resolved(i))
            .map(|resolved| {
                format!(
                    "[scene {}] {}: {}",
                    resolved.index + 1,
                    resolved.character.as_deref().unwrap_or(""),
                    resolved.text.as_deref().unwrap_or(""),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn reindex(&mut self) {
        for (index, scene) in self.scenes.iter_mut().enumerate() {
            scene.order = index;
        }
    }
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest preceding concrete value for a field, scanning backward from
/// (not including) `index`.
fn scan_back<'a, T, F>(scenes: &'a [Scene], index: usize, get: F) -> Option<&'a T>
where
    F: Fn(&'a Scene) -> Option<&'a T>,
{
    scenes[..index].iter().rev().find_map(get)
}
