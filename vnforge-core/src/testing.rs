//! Testing utilities.
//!
//! This module provides tools for integration testing:
//! - `ScriptedCollaborator` for deterministic AI results without a service
//! - `StudioHarness` for full-session scenarios over a throwaway directory
//! - Assertion helpers for verifying editor state

use crate::session::{SessionError, StudioSession};
use std::path::{Path, PathBuf};

/// A scripted stand-in for the AI text/image collaborator.
///
/// Returns queued results in order; once the script runs out, every call
/// fails the way a real collaborator failure surfaces (a string message).
pub struct ScriptedCollaborator {
    responses: Vec<Result<String, String>>,
    response_index: usize,
}

impl ScriptedCollaborator {
    /// Create a collaborator with scripted results.
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses,
            response_index: 0,
        }
    }

    /// Queue another result.
    pub fn queue(&mut self, response: Result<String, String>) {
        self.responses.push(response);
    }

    /// Next scripted result. The context argument mirrors the real
    /// collaborator's signature and is ignored here.
    pub fn generate_text(&mut self, _context: &str) -> Result<String, String> {
        if self.response_index < self.responses.len() {
            let response = self.responses[self.response_index].clone();
            self.response_index += 1;
            response
        } else {
            Err("no more scripted responses".to_string())
        }
    }

    /// Replay the script from the beginning.
    pub fn reset(&mut self) {
        self.response_index = 0;
    }
}

/// Test harness running a full session in a unique throwaway directory.
///
/// The directory is removed on drop.
pub struct StudioHarness {
    /// The session under test.
    pub session: StudioSession,
    /// The scripted collaborator.
    pub collaborator: ScriptedCollaborator,
    root: PathBuf,
}

impl StudioHarness {
    /// Create a harness over a fresh data directory.
    pub async fn new() -> Result<Self, SessionError> {
        let root = std::env::temp_dir().join(format!("vnforge-harness-{}", uuid::Uuid::new_v4()));
        let session = StudioSession::open(&root).await?;
        Ok(Self {
            session,
            collaborator: ScriptedCollaborator::new(Vec::new()),
            root,
        })
    }

    /// Queue a successful collaborator response.
    pub fn expect_dialogue(&mut self, text: impl Into<String>) -> &mut Self {
        self.collaborator.queue(Ok(text.into()));
        self
    }

    /// Queue a collaborator failure.
    pub fn expect_failure(&mut self, message: impl Into<String>) -> &mut Self {
        self.collaborator.queue(Err(message.into()));
        self
    }

    /// Run one generate-and-apply round: the scripted collaborator is
    /// handed the current transcript and its result is applied to the
    /// current scene.
    pub fn generate(&mut self) {
        let context = self.session.scenes().transcript();
        let result = self.collaborator.generate_text(&context);
        self.session.apply_generated_text(result);
    }

    /// The data directory backing this harness.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for StudioHarness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the current scene's resolved text.
#[track_caller]
pub fn assert_current_text(harness: &StudioHarness, expected: &str) {
    let resolved = harness
        .session
        .scenes()
        .current_resolved()
        .expect("current scene should resolve");
    assert_eq!(
        resolved.text.as_deref(),
        Some(expected),
        "Expected current scene text {expected:?}"
    );
}

/// Assert that an achievement is unlocked.
#[track_caller]
pub fn assert_unlocked(harness: &StudioHarness, id: &str) {
    assert!(
        harness.session.achievements().is_unlocked(id),
        "Expected achievement '{id}' to be unlocked"
    );
}

/// Assert that an achievement is NOT unlocked.
#[track_caller]
pub fn assert_locked(harness: &StudioHarness, id: &str) {
    assert!(
        !harness.session.achievements().is_unlocked(id),
        "Expected achievement '{id}' to be locked"
    );
}
