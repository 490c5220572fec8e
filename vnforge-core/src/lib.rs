//! Visual novel scene editor core.
//!
//! This crate provides:
//! - A scene document with per-field inherit-from-previous resolution
//! - Hybrid local persistence: lightweight JSON documents plus a binary
//!   object store for image payloads and screenshots
//! - A deduplicated, usage-ranked character registry
//! - A statistics accumulator with threshold-unlocked achievements
//!
//! # Quick Start
//!
//! ```ignore
//! use vnforge_core::{SceneUpdate, StudioSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = StudioSession::open("./data").await?;
//!
//!     session.scenes_mut().add_scene();
//!     session.scenes_mut().update_current_scene(
//!         SceneUpdate::default()
//!             .with_character("Rin")
//!             .with_text("Were you expecting something to happen?"),
//!     );
//!     session.sync_scene_stats();
//!
//!     session.persist().await?;
//!     Ok(())
//! }
//! ```

pub mod achievements;
pub mod ai;
pub mod characters;
pub mod document;
pub mod objects;
pub mod session;
pub mod storage;
pub mod store;
pub mod testing;

// Primary public API
pub use achievements::{AchievementDef, AchievementTracker, Stats, StatsUpdate, ACHIEVEMENTS};
pub use ai::{AiConfig, AiConfigError};
pub use characters::{Character, CharacterId, CharacterRegistry};
pub use document::{Background, Mode, ResolvedScene, Scene, SceneDocument, SceneId, SceneUpdate};
pub use objects::{ObjectStore, Partition, Screenshot, StoredObject};
pub use session::{SessionError, StudioSession};
pub use storage::{KvStore, StorageError};
pub use store::{SceneStore, StoreError};
pub use testing::{ScriptedCollaborator, StudioHarness};
