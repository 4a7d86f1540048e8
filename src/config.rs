//! Configuration types for the assistant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Chat relay endpoint settings.
    pub relay: RelayConfig,
    /// Language model settings.
    pub llm: LlmConfig,
    /// Voice input/output settings.
    pub voice: VoiceConfig,
}

/// Chat relay endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bind address for the local relay service.
    pub host: String,
    /// Bind port (0 = pick an ephemeral port).
    pub port: u16,
    /// Upstream chat-completions endpoint URL.
    pub upstream_url: String,
    /// Timeout in seconds for a single upstream attempt.
    ///
    /// Each credential in the fallback sequence gets its own attempt, so the
    /// worst case for one request is `keys * request_timeout_secs`.
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3271,
            upstream_url: "https://openrouter.ai/api/v1/chat/completions".to_owned(),
            request_timeout_secs: 30,
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model ID tried first for every user turn.
    pub primary_model: String,
    /// Model ID tried when the primary fails or returns no content.
    pub secondary_model: String,
    /// Sampling temperature forwarded to the upstream API.
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary_model: "deepseek/deepseek-r1:free".to_owned(),
            secondary_model: "mistralai/mistral-7b-instruct".to_owned(),
            temperature: 0.7,
        }
    }
}

/// Voice input/output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Synthesizer voice name, or "default" for the platform default.
    pub voice: String,
    /// Speech speed multiplier.
    ///
    /// The picker offers 0.8 / 1.0 / 1.2 / 1.5; any positive value is valid.
    pub speed: f32,
    /// Recognition language tag (BCP-47).
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: "default".to_owned(),
            speed: 1.0,
            language: "en-US".to_owned(),
        }
    }
}

impl AssistConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AssistError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AssistError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/pooja/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("pooja").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("pooja")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/pooja-config/config.toml")
        }
    }
}
