//! API key storage and fallback-key loading.
//!
//! The user's OpenRouter keys live in `~/.config/pooja/keys.toml` as three
//! named slots: a primary key and two backups. Server-held fallback keys are
//! read from environment variables at startup. Key values are never logged;
//! [`StoredKeys`] redacts them in its `Debug` output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable for the server's primary fallback key.
pub const ENV_KEY_PRIMARY: &str = "OPENROUTER_API_KEY";
/// Environment variable for the server's first backup key.
pub const ENV_KEY_BACKUP_1: &str = "OPENROUTER_API_KEY_BACKUP_1";
/// Environment variable for the server's second backup key.
pub const ENV_KEY_BACKUP_2: &str = "OPENROUTER_API_KEY_BACKUP_2";

/// The user's stored API key slots.
///
/// Slots are optional; an empty string is treated the same as an unset slot
/// and is removed when saving.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredKeys {
    /// Primary API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    /// First backup key, tried after the primary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_1: Option<String>,
    /// Second backup key, tried last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_2: Option<String>,
}

impl fmt::Debug for StoredKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKeys")
            .field("primary", &redact(&self.primary))
            .field("backup_1", &redact(&self.backup_1))
            .field("backup_2", &redact(&self.backup_2))
            .finish()
    }
}

fn redact(slot: &Option<String>) -> &'static str {
    match slot {
        Some(s) if !s.is_empty() => "[REDACTED]",
        _ => "<unset>",
    }
}

impl StoredKeys {
    /// Load stored keys from a TOML file.
    ///
    /// A missing file is not an error; it yields an empty key set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AssistError::Config(e.to_string()))
    }

    /// Save stored keys to a TOML file, creating parent directories as needed.
    ///
    /// Empty-string slots are dropped before writing, so saving a cleared
    /// field removes its entry from the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the keys cannot be
    /// serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.normalized())
            .map_err(|e| crate::error::AssistError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default key store path: `~/.config/pooja/keys.toml`.
    pub fn default_store_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("pooja").join("keys.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("pooja")
                .join("keys.toml")
        } else {
            PathBuf::from("/tmp/pooja-config/keys.toml")
        }
    }

    /// Returns a copy with empty-string slots collapsed to `None`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        fn clean(slot: &Option<String>) -> Option<String> {
            slot.as_ref().filter(|s| !s.is_empty()).cloned()
        }
        Self {
            primary: clean(&self.primary),
            backup_1: clean(&self.backup_1),
            backup_2: clean(&self.backup_2),
        }
    }

    /// Returns the non-empty keys in fallback order: primary, backup 1, backup 2.
    #[must_use]
    pub fn ordered(&self) -> Vec<String> {
        [&self.primary, &self.backup_1, &self.backup_2]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect()
    }

    /// True when no slot holds a usable key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered().is_empty()
    }
}

/// Read the server-held fallback keys from the environment.
///
/// Returns the non-empty values of the three `OPENROUTER_API_KEY*` variables
/// in fallback order. Unset and blank variables are skipped.
#[must_use]
pub fn env_fallback_keys() -> Vec<String> {
    keys_from_env([ENV_KEY_PRIMARY, ENV_KEY_BACKUP_1, ENV_KEY_BACKUP_2])
}

fn keys_from_env(vars: [&str; 3]) -> Vec<String> {
    vars.into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
        .collect()
}
