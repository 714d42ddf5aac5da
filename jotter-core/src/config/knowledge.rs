//! Resolved settings for the notes engine.
//!
//! `KnowledgeSettings` is the non-optional view `jotter-knowledge` works with.
//! It is built from the user-facing [`Settings`] plus the resolved storage
//! root, so the engine never reads the environment itself.

use std::path::PathBuf;

use crate::paths::{HostDirs, ResolvedRoot, expand_tilde};

use super::settings::{SearchSettings, Settings};

#[derive(Debug, Clone)]
pub struct KnowledgeSettings {
    /// Storage root holding the year directories and the index.
    pub root: PathBuf,
    /// Default result count for searches.
    pub max_results: usize,
    /// Characters of body text returned per search hit.
    pub preview_chars: usize,
    /// Absolute directories a migration source must live under.
    pub allowed_import_roots: Vec<PathBuf>,
}

impl KnowledgeSettings {
    /// Defaults around a root, with no directory allowed for imports.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let search = SearchSettings::default();
        Self {
            root: root.into(),
            max_results: search.max_results,
            preview_chars: search.preview_chars,
            allowed_import_roots: Vec::new(),
        }
    }

    pub fn resolve(settings: &Settings, root: &ResolvedRoot, host: &HostDirs) -> Self {
        let allowed_import_roots = settings
            .migrate
            .allowed_roots
            .iter()
            .map(|path| expand_tilde(path, host.home.as_deref()))
            .collect();
        Self {
            root: root.path.clone(),
            max_results: settings.search.max_results,
            preview_chars: settings.search.preview_chars,
            allowed_import_roots,
        }
    }
}
