use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::KnowledgeResult;
use crate::ingest::records_for_file;
use crate::paths::{FileRef, INDEX_FILE_NAME, index_path, list_monthly_files};
use crate::storage::{StagedWrite, TMP_SUFFIX, write_atomic};

pub const INDEX_VERSION: u32 = 1;

/// One indexed entry. Rebuildable from the monthly files at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub heading: String,
    pub category: Option<String>,
    pub file: String,
    /// Position of the entry within its file.
    pub ordinal: usize,
    pub line: usize,
    pub created: Option<NaiveDate>,
    pub updated: Option<NaiveDate>,
    pub date: NaiveDate,
    pub content_preview: String,
    pub keywords: Vec<String>,
    pub text: String,
}

/// Size and modification time of a monthly file when it was indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub len: u64,
    pub modified_ns: u64,
}

impl FileStamp {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified_ns = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        Ok(Self {
            len: metadata.len(),
            modified_ns,
        })
    }
}

/// Whether [`Index::load_or_build`] reused the stored index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Cached,
    Rebuilt,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub version: u32,
    pub total_files: usize,
    pub total_entries: usize,
    pub files: BTreeMap<String, FileStamp>,
    pub entries: Vec<IndexRecord>,
}

impl Index {
    /// Scan every monthly file. Unreadable or non-UTF-8 files are logged and
    /// contribute no records.
    pub fn build(root: &Path) -> Self {
        let mut index = Self {
            version: INDEX_VERSION,
            ..Self::default()
        };

        for file in list_monthly_files(root) {
            let path = file.path(root);
            let stamp = match FileStamp::of(&path) {
                Ok(stamp) => stamp,
                Err(err) => {
                    warn!(file = %file.relative, error = %err, "skipping unreadable monthly file");
                    continue;
                }
            };
            index.files.insert(file.relative.clone(), stamp);

            match fs::read(&path).map(String::from_utf8) {
                Ok(Ok(text)) => index.entries.extend(records_for_file(&file, &text)),
                Ok(Err(_)) => {
                    warn!(file = %file.relative, "skipping monthly file that is not valid UTF-8");
                }
                Err(err) => {
                    warn!(file = %file.relative, error = %err, "skipping unreadable monthly file");
                }
            }
        }

        index.refresh_totals();
        index
    }

    /// Full rescan, persisted atomically.
    pub fn rebuild(root: &Path) -> KnowledgeResult<Self> {
        let index = Self::build(root);
        index.save(root)?;
        info!(
            files = index.total_files,
            entries = index.total_entries,
            "rebuilt index"
        );
        Ok(index)
    }

    /// Stored index, or `None` when it is missing, unparseable, or from
    /// another format version.
    pub fn load(root: &Path) -> KnowledgeResult<Option<Self>> {
        let path = index_path(root);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                warn!(path = %path.display(), "index is not valid UTF-8, ignoring it");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(index) if index.version == INDEX_VERSION => Ok(Some(index)),
            Ok(index) => {
                warn!(version = index.version, "index format version mismatch, ignoring it");
                Ok(None)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "index is corrupt, ignoring it");
                Ok(None)
            }
        }
    }

    /// Stored index when it matches the files on disk, otherwise a fresh scan
    /// (not persisted; the caller decides whether to save).
    pub fn load_or_build(root: &Path) -> KnowledgeResult<(Self, IndexSource)> {
        if let Some(index) = Self::load(root)? {
            if index.is_fresh(root) {
                return Ok((index, IndexSource::Cached));
            }
            debug!("index is stale");
        }
        Ok((Self::build(root), IndexSource::Rebuilt))
    }

    /// True when the indexed file set and stamps equal what is on disk.
    pub fn is_fresh(&self, root: &Path) -> bool {
        let on_disk = list_monthly_files(root);
        if on_disk.len() != self.files.len() {
            return false;
        }
        on_disk.iter().all(|file| {
            let Some(stamp) = self.files.get(&file.relative) else {
                return false;
            };
            FileStamp::of(&file.path(root)).is_ok_and(|current| current == *stamp)
        })
    }

    pub fn save(&self, root: &Path) -> KnowledgeResult<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::create_dir_all(root)?;
        write_atomic(&index_path(root), json.as_bytes())
    }

    /// Save from a reader that does not hold the root lock, through a temp
    /// file private to this process. A lost race with a writer leaves stamps
    /// that no longer match the files, so the next load rebuilds.
    pub fn save_unlocked(&self, root: &Path) -> KnowledgeResult<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        let target = index_path(root);
        let tmp = root.join(format!("{INDEX_FILE_NAME}.{}{TMP_SUFFIX}", std::process::id()));
        StagedWrite::stage_via(&target, tmp, json.as_bytes())?.commit()
    }

    /// Re-derive the records of one file after a write and refresh its
    /// stamp. Other files are left as they are.
    pub fn patch_file(&mut self, root: &Path, file: &FileRef, content: &str) -> KnowledgeResult<()> {
        let stamp = FileStamp::of(&file.path(root))?;
        self.entries.retain(|record| record.file != file.relative);
        self.entries.extend(records_for_file(file, content));
        self.files.insert(file.relative.clone(), stamp);

        // Stable sort keeps each file's entries in ordinal order.
        self.entries.sort_by(|a, b| {
            match (FileRef::from_relative(&a.file), FileRef::from_relative(&b.file)) {
                (Some(a), Some(b)) => a.newest_first(&b),
                _ => b.file.cmp(&a.file),
            }
        });
        self.refresh_totals();
        debug!(file = %file.relative, entries = self.entries.len(), "patched index");
        Ok(())
    }

    fn refresh_totals(&mut self) {
        self.total_files = self.files.len();
        self.total_entries = self.entries.len();
    }
}
