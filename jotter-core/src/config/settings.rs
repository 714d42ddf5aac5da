//! Settings configuration loaded from TOML files.
//!
//! This module handles the optional settings file stored in the XDG config
//! directory (`~/.config/jotter/config.toml`). Every field has a default, so a
//! missing file is equivalent to an empty one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Non-sensitive settings for the notes store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Storage root configuration
    #[serde(default)]
    pub notes: NotesSettings,

    /// Search tuning
    #[serde(default)]
    pub search: SearchSettings,

    /// Import restrictions
    #[serde(default)]
    pub migrate: MigrateSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Storage root settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotesSettings {
    /// Root directory for monthly files. `~` is expanded.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Search settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Results returned by `search` when the request does not say.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Characters of body text included in each search result.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

/// Migration settings
#[derive(Debug, Clone, Deserialize)]
pub struct MigrateSettings {
    /// Directories a migration source must live under. `~` is expanded.
    #[serde(default = "default_allowed_roots")]
    pub allowed_roots: Vec<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_max_results() -> usize {
    10
}

fn default_preview_chars() -> usize {
    300
}

fn default_allowed_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("~")]
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl Default for MigrateSettings {
    fn default() -> Self {
        Self {
            allowed_roots: default_allowed_roots(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the default configuration file.
    ///
    /// A missing file yields defaults; nothing is written to disk.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load settings from a specific file, falling back to defaults when it
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/jotter/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("JOTTER_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("jotter");

        Ok(config_dir.join("config.toml"))
    }
}
