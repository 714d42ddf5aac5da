//! Configuration management for jotter.
//!
//! Configuration comes from three places, in increasing precedence:
//!
//! ## Settings (TOML File)
//! Located at `~/.config/jotter/config.toml` (directory overridable with
//! `JOTTER_CONFIG_DIR`). Optional:
//! ```toml
//! [notes]
//! root = "~/notes"
//!
//! [search]
//! max_results = 10
//! preview_chars = 300
//!
//! [migrate]
//! allowed_roots = ["~"]
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! ## Environment
//! - `NOTES_DIR` - storage root override
//! - `RUST_LOG` - tracing filter override
//!
//! ## Explicit override
//! A root passed on the command line or in the request itself.

pub mod knowledge;
mod settings;

use std::path::{Path, PathBuf};

use crate::paths::{PathError, ResolvedRoot, resolve_root_from_env};

pub use knowledge::KnowledgeSettings;
pub use settings::{
    LoggingSettings, MigrateSettings, NotesSettings, SearchSettings, Settings, SettingsError,
};

/// Settings plus the storage root they resolve to.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub root: ResolvedRoot,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),
}

impl Config {
    /// Load settings (from `config_file` or the default location) and
    /// resolve the storage root.
    pub fn load(explicit_root: Option<&Path>, config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match config_file {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        let root = resolve_root_from_env(explicit_root, &settings)?;
        tracing::debug!(root = %root.path.display(), source = ?root.source, "storage root resolved");
        Ok(Self { settings, root })
    }

    /// Build a config around an already-known root. Used by tests and by
    /// callers that resolve the root themselves.
    pub fn with_root(settings: Settings, root: ResolvedRoot) -> Self {
        Self { settings, root }
    }

    pub fn root_path(&self) -> &Path {
        &self.root.path
    }

    /// Path of the settings file that was (or would have been) read.
    pub fn settings_path(config_file: Option<&Path>) -> Option<PathBuf> {
        match config_file {
            Some(path) => Some(path.to_path_buf()),
            None => Settings::config_path().ok(),
        }
    }
}

/// Load a `.env` file from the working directory if present.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
