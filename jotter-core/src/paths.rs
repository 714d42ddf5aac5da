//! Storage root resolution.
//!
//! The root is chosen from, in order: an explicit override, the `NOTES_DIR`
//! environment variable, `notes.root` in the settings file, then the platform
//! default. The default prefers a OneDrive-synced Documents folder when one
//! exists so desktop and CLI hosts on the same machine agree on a location.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Settings;

pub const NOTES_DIR_ENV: &str = "NOTES_DIR";
pub const NOTES_DIR_NAME: &str = "notes";
pub const INDEX_FILE_NAME: &str = ".index.json";
pub const LOCK_FILE_NAME: &str = ".lock";

/// Where the resolved root came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RootSource {
    Explicit,
    Environment,
    Settings,
    OneDrive,
    Documents,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedRoot {
    pub path: PathBuf,
    pub source: RootSource,
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found")]
    MissingHomeDir,
}

/// Host directories the default depends on. Filled from `dirs` in
/// production, constructed by hand in tests.
#[derive(Debug, Clone, Default)]
pub struct HostDirs {
    pub home: Option<PathBuf>,
    pub documents: Option<PathBuf>,
}

impl HostDirs {
    pub fn detect() -> Self {
        Self {
            home: dirs::home_dir(),
            documents: dirs::document_dir(),
        }
    }

    pub fn onedrive_documents(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join("OneDrive").join("Documents"))
    }
}

/// Pure resolution over already-gathered inputs.
pub fn resolve_root(
    explicit: Option<&Path>,
    env_value: Option<&str>,
    configured: Option<&Path>,
    host: &HostDirs,
) -> Result<ResolvedRoot, PathError> {
    if let Some(path) = explicit {
        return Ok(ResolvedRoot {
            path: expand_tilde(path, host.home.as_deref()),
            source: RootSource::Explicit,
        });
    }

    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(ResolvedRoot {
            path: expand_tilde(Path::new(value), host.home.as_deref()),
            source: RootSource::Environment,
        });
    }

    if let Some(path) = configured {
        return Ok(ResolvedRoot {
            path: expand_tilde(path, host.home.as_deref()),
            source: RootSource::Settings,
        });
    }

    default_root(host)
}

/// Platform default: OneDrive Documents when present, else the user's
/// documents directory.
pub fn default_root(host: &HostDirs) -> Result<ResolvedRoot, PathError> {
    if let Some(onedrive) = host.onedrive_documents()
        && onedrive.is_dir()
    {
        return Ok(ResolvedRoot {
            path: onedrive.join(NOTES_DIR_NAME),
            source: RootSource::OneDrive,
        });
    }

    let documents = match (&host.documents, &host.home) {
        (Some(documents), _) => documents.clone(),
        (None, Some(home)) => home.join("Documents"),
        (None, None) => return Err(PathError::MissingHomeDir),
    };

    Ok(ResolvedRoot {
        path: documents.join(NOTES_DIR_NAME),
        source: RootSource::Documents,
    })
}

/// Resolve using the real environment and host directories.
pub fn resolve_root_from_env(
    explicit: Option<&Path>,
    settings: &Settings,
) -> Result<ResolvedRoot, PathError> {
    let env_value = std::env::var(NOTES_DIR_ENV).ok();
    resolve_root(
        explicit,
        env_value.as_deref(),
        settings.notes.root.as_deref(),
        &HostDirs::detect(),
    )
}

/// Expand a leading `~` component against `home`.
pub fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

pub fn index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE_NAME)
}

pub fn lock_path(root: &Path) -> PathBuf {
    root.join(LOCK_FILE_NAME)
}
