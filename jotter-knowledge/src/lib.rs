//! Monthly markdown journal store: entry codec, crash-safe storage, the
//! derived search index and the relevance engine.

pub mod category;
pub mod engine;
pub mod errors;
pub mod index;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod paths;
pub mod search;
pub mod storage;

pub use engine::NotesEngine;
pub use errors::{KnowledgeError, KnowledgeResult};
pub use jotter_core::config::KnowledgeSettings;
pub use models::{
    Alternative, AppendOutcome, AppendResult, CleanIndexResult, DateRange, Entry, EntryUpdate,
    ImportError, ImportedFile, KeywordCount, MigrateDetails, MigrateReport, MigrateStatus,
    NoteAppendRequest, NoteCreateRequest, NoteWriteResult, ReindexResult, SearchHit, Severity,
    SkippedFile, StatsReport, StorageInfo, ValidationIssue, ValidationReport,
};
pub use search::CONFIDENCE_THRESHOLD;
