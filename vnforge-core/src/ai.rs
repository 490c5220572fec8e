//! AI collaborator configuration.
//!
//! The core never talks to the generation service itself; it persists the
//! configuration the host hands to the collaborator and validates it
//! before any call is attempted. Results come back through
//! [`crate::session::StudioSession::apply_generated_text`] and friends.

use crate::storage::{KvStore, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SETTINGS_KEY: &str = "settings";

/// Errors from configuration validation.
#[derive(Debug, Error)]
pub enum AiConfigError {
    #[error("API key is missing")]
    MissingApiKey,
}

/// Connection settings for the external text/image generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: String,

    /// Custom endpoint; `None` uses the service default.
    pub base_url: Option<String>,

    pub text_model: String,
    pub image_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            text_model: "gpt-3.5-turbo".to_string(),
            image_model: "dall-e-3".to_string(),
        }
    }
}

impl AiConfig {
    /// Reject an unusable configuration before any side effect.
    pub fn validate(&self) -> Result<(), AiConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(AiConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Load the persisted configuration, or defaults on a cold profile.
    pub async fn load(kv: &KvStore) -> Result<Self, StorageError> {
        Ok(kv.get::<Self>(SETTINGS_KEY).await?.unwrap_or_default())
    }

    /// Persist the configuration.
    pub async fn save(&self, kv: &KvStore) -> Result<(), StorageError> {
        kv.put(SETTINGS_KEY, self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_rejects_missing_key() {
        let config = AiConfig::default();
        assert!(matches!(
            config.validate(),
            Err(AiConfigError::MissingApiKey)
        ));

        let config = AiConfig {
            api_key: "   ".to_string(),
            ..AiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_key() {
        let config = AiConfig {
            api_key: "sk-test".to_string(),
            ..AiConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_defaults_on_cold_profile() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path()).await.unwrap();

        let config = AiConfig::load(&kv).await.unwrap();
        assert_eq!(config, AiConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path()).await.unwrap();

        let config = AiConfig {
            api_key: "sk-test".to_string(),
            base_url: Some("https://proxy.example/v1".to_string()),
            text_model: "gpt-4o".to_string(),
            image_model: "dall-e-3".to_string(),
        };
        config.save(&kv).await.unwrap();

        let loaded = AiConfig::load(&kv).await.unwrap();
        assert_eq!(loaded, config);
    }
}
