use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::warn;

use crate::KnowledgeSettings;
use crate::errors::KnowledgeResult;
use crate::index::{Index, IndexSource};
use crate::models::{
    AppendOutcome, CleanIndexResult, MigrateReport, NoteAppendRequest, NoteCreateRequest,
    NoteWriteResult, ReindexResult, SearchHit, StatsReport, StorageInfo, ValidationReport,
};

pub(crate) mod maintenance;
pub(crate) mod migrate;
pub(crate) mod notes;
pub(crate) mod search;

/// Runs every notes operation against one storage root.
///
/// Cheap to construct; holds no open files. Several engines over different
/// roots can coexist.
#[derive(Debug, Clone)]
pub struct NotesEngine {
    settings: KnowledgeSettings,
    today: Option<NaiveDate>,
}

impl NotesEngine {
    pub fn new(settings: KnowledgeSettings) -> Self {
        Self {
            settings,
            today: None,
        }
    }

    /// Pin the engine's notion of "today" (timestamps and recency).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Access the knowledge settings.
    pub fn settings(&self) -> &KnowledgeSettings {
        &self.settings
    }

    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Add a new entry to the current month's file.
    pub fn add(&self, request: NoteCreateRequest) -> KnowledgeResult<NoteWriteResult> {
        notes::add(self, request)
    }

    /// Ranked search over the index.
    pub fn search(&self, query: &str, max_results: Option<usize>) -> KnowledgeResult<Vec<SearchHit>> {
        search::search(self, query, max_results)
    }

    /// Append a dated update to the best-matching entry, if it is a
    /// confident match.
    pub fn append(&self, request: NoteAppendRequest) -> KnowledgeResult<AppendOutcome> {
        notes::append(self, request)
    }

    pub fn reindex(&self) -> KnowledgeResult<ReindexResult> {
        maintenance::reindex(self)
    }

    pub fn stats(&self) -> KnowledgeResult<StatsReport> {
        search::stats(self)
    }

    pub fn validate(&self) -> KnowledgeResult<ValidationReport> {
        maintenance::validate(self)
    }

    /// Import markdown from a legacy directory.
    pub fn migrate(&self, source: &Path) -> KnowledgeResult<MigrateReport> {
        migrate::migrate(self, source)
    }

    /// Back up the index, rebuild it, and restore the backup on failure.
    pub fn clean_index(&self) -> KnowledgeResult<CleanIndexResult> {
        maintenance::clean_index(self)
    }

    pub fn storage_info(&self) -> StorageInfo {
        maintenance::storage_info(self)
    }

    /// Index for a read. Readers take no lock; a rebuilt index is saved
    /// best-effort.
    pub(crate) fn read_index(&self) -> KnowledgeResult<Index> {
        let root = self.root();
        let (index, source) = Index::load_or_build(root)?;
        if source == IndexSource::Rebuilt
            && root.is_dir()
            && let Err(err) = index.save_unlocked(root)
        {
            warn!(error = %err, "failed to persist rebuilt index");
        }
        Ok(index)
    }
}
