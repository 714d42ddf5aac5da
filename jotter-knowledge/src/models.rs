use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One discrete note inside a monthly file.
///
/// There is no persistent identifier: an entry is addressed by its heading
/// and owning file, and duplicate headings are told apart by ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub heading: String,
    pub body: String,
    pub created: Option<NaiveDate>,
    #[serde(default)]
    pub updates: Vec<EntryUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub date: NaiveDate,
    pub text: String,
}

impl Entry {
    pub fn new(heading: impl Into<String>, body: impl Into<String>, created: NaiveDate) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
            created: Some(created),
            updates: Vec::new(),
        }
    }

    /// Most recent date the entry carries: the latest update, else creation.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.updates
            .iter()
            .map(|update| update.date)
            .chain(self.created)
            .max()
    }

    pub fn last_update(&self) -> Option<NaiveDate> {
        self.updates.iter().map(|update| update.date).max()
    }

    /// Category prefix of a `"<Category> - <description>"` heading.
    pub fn category(&self) -> Option<&str> {
        crate::category::category_of(&self.heading)
    }

    /// Body plus update texts; what content matching runs against.
    pub fn search_text(&self) -> String {
        let mut text = self.body.clone();
        for update in &self.updates {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&update.text);
        }
        text
    }
}

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteCreateRequest {
    pub heading: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteAppendRequest {
    pub search_term: String,
    pub text: String,
}

// ── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteWriteResult {
    /// Monthly file, relative to the storage root.
    pub file: String,
    pub heading: String,
    pub category: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub heading: String,
    /// Body text, truncated to the configured preview length.
    pub content: String,
    pub file: String,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub heading: String,
    pub file: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendResult {
    pub heading: String,
    pub file: String,
    pub score: i64,
    pub date: NaiveDate,
    /// Headings of the runner-up candidates.
    pub alternatives: Vec<String>,
}

/// Outcome of an append: either the confident match was updated, or nothing
/// scored high enough and the caller gets the candidates back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AppendOutcome {
    Appended(AppendResult),
    NotConfident {
        query: String,
        alternatives: Vec<Alternative>,
    },
}

impl AppendOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexResult {
    pub total_files: usize,
    pub total_entries: usize,
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanIndexResult {
    pub message: String,
    pub reindex_result: ReindexResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub total_entries: usize,
    pub total_files: usize,
    pub categories: BTreeMap<String, usize>,
    pub date_range: Option<DateRange>,
    pub top_keywords: Vec<KeywordCount>,
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub file: String,
    pub issue: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub files_checked: usize,
    pub issues_found: usize,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MigrateStatus {
    Success,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportedFile {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateDetails {
    pub imported_files: Vec<ImportedFile>,
    pub skipped_files: Vec<SkippedFile>,
    pub errors: Vec<ImportError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateReport {
    pub status: MigrateStatus,
    pub imported: usize,
    pub skipped: usize,
    pub errors: usize,
    pub details: MigrateDetails,
    pub index_rebuilt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageInfo {
    pub notes_dir: PathBuf,
    pub notes_dir_exists: bool,
    pub notes_dir_is_writable: bool,
    pub index_file: PathBuf,
    pub index_exists: bool,
    pub current_month_file: PathBuf,
}
