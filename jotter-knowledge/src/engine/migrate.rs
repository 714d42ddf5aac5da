use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local};
use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::category::{has_category_prefix, infer_category};
use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::index::Index;
use crate::models::{
    ImportError, ImportedFile, MigrateDetails, MigrateReport, MigrateStatus, SkippedFile,
};
use crate::parser::{is_title_heading, title_line, top_level_heading, update_fence};
use crate::paths::{FileRef, is_hidden};
use crate::storage::{RootLock, write_atomic};

use super::NotesEngine;

/// Legacy single-file-per-month names such as `2025-11.md`.
static LEGACY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("legacy name regex"));

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Imported content headed for one monthly file.
struct MonthBatch {
    file: FileRef,
    chunks: Vec<String>,
    sources: Vec<String>,
}

pub(crate) fn migrate(engine: &NotesEngine, source: &Path) -> KnowledgeResult<MigrateReport> {
    let root = engine.root();
    let source = check_source(engine, source)?;
    fs::create_dir_all(root)?;
    let store = fs::canonicalize(root)?;
    let _lock = RootLock::acquire(root)?;

    let mut details = MigrateDetails::default();
    let mut batches: BTreeMap<String, MonthBatch> = BTreeMap::new();

    let walker = WalkDir::new(&source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || (!is_hidden(&entry.file_name().to_string_lossy()) && entry.path() != store)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let file = err
                    .path()
                    .map(|path| relative_name(&source, path))
                    .unwrap_or_default();
                details.errors.push(ImportError {
                    file,
                    error: err.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = relative_name(&source, path);
        let text = match fs::read(path).map(String::from_utf8) {
            Ok(Ok(text)) => text,
            Ok(Err(_)) => {
                details.errors.push(ImportError {
                    file: relative,
                    error: "not valid UTF-8".to_string(),
                });
                continue;
            }
            Err(err) => {
                details.errors.push(ImportError {
                    file: relative,
                    error: err.to_string(),
                });
                continue;
            }
        };

        if !is_markdown(path) {
            details.skipped_files.push(skipped(&relative, "not a markdown file"));
            continue;
        }
        if text.trim().is_empty() {
            details.skipped_files.push(skipped(&relative, "empty file"));
            continue;
        }

        let file = match target_month(path) {
            Ok(file) => file,
            Err(err) => {
                details.errors.push(ImportError {
                    file: relative,
                    error: err.to_string(),
                });
                continue;
            }
        };

        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let batch = batches
            .entry(file.relative.clone())
            .or_insert_with(|| MonthBatch {
                file,
                chunks: Vec::new(),
                sources: Vec::new(),
            });
        batch.chunks.push(normalize_import(&text, &stem));
        batch.sources.push(relative);
    }

    for batch in batches.into_values() {
        match write_batch(root, &batch) {
            Ok(()) => {
                for source in batch.sources {
                    details.imported_files.push(ImportedFile {
                        source,
                        destination: batch.file.relative.clone(),
                    });
                }
            }
            Err(err) => {
                warn!(file = %batch.file.relative, error = %err, "failed to write imported notes");
                for source in batch.sources {
                    details.errors.push(ImportError {
                        file: source,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    let index_rebuilt = match Index::rebuild(root) {
        Ok(_) => true,
        Err(err) => {
            warn!(error = %err, "index rebuild after migration failed");
            false
        }
    };

    info!(
        imported = details.imported_files.len(),
        skipped = details.skipped_files.len(),
        errors = details.errors.len(),
        "migration finished"
    );

    Ok(MigrateReport {
        status: if details.errors.is_empty() {
            MigrateStatus::Success
        } else {
            MigrateStatus::Partial
        },
        imported: details.imported_files.len(),
        skipped: details.skipped_files.len(),
        errors: details.errors.len(),
        details,
        index_rebuilt,
    })
}

/// Canonical source directory, if it may be imported from.
fn check_source(engine: &NotesEngine, source: &Path) -> KnowledgeResult<PathBuf> {
    if !source.exists() {
        return Err(KnowledgeError::SourceNotFound(source.to_path_buf()));
    }
    if !source.is_dir() {
        return Err(KnowledgeError::InvalidField {
            field: "source_dir",
            reason: format!("{} is not a directory", source.display()),
        });
    }
    let source = fs::canonicalize(source)?;

    let allowed = engine
        .settings()
        .allowed_import_roots
        .iter()
        .filter_map(|root| fs::canonicalize(root).ok())
        .any(|root| source.starts_with(&root));
    if !allowed {
        return Err(KnowledgeError::PathOutsideRoot(source));
    }

    let store = fs::canonicalize(engine.root()).unwrap_or_else(|_| engine.root().to_path_buf());
    if source.starts_with(&store) {
        return Err(KnowledgeError::InvalidField {
            field: "source_dir",
            reason: "source is inside the notes directory".to_string(),
        });
    }
    Ok(source)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// `/`-separated path of `path` below `base`.
fn relative_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn skipped(file: &str, reason: &str) -> SkippedFile {
    SkippedFile {
        file: file.to_string(),
        reason: reason.to_string(),
    }
}

/// Month a source file is filed under: the month in a legacy `YYYY-MM`
/// name, else the file's local modification month.
fn target_month(path: &Path) -> std::io::Result<FileRef> {
    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
        && let Some(caps) = LEGACY_NAME.captures(stem)
        && let (Ok(year), Ok(month)) = (caps[1].parse::<i32>(), caps[2].parse::<u32>())
        && (1..=12).contains(&month)
    {
        return Ok(FileRef::for_month(year, month));
    }

    let modified: DateTime<Local> = fs::metadata(path)?.modified()?.into();
    Ok(FileRef::for_month(modified.year(), modified.month()))
}

/// Strip title lines and make sure every top-level heading carries a
/// category. Text before the first heading gets a heading from the file
/// name.
fn normalize_import(text: &str, stem: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut fence = None;
    let mut seen_content = false;

    for line in text.lines() {
        let heading = if update_fence(&mut fence, line) {
            None
        } else {
            top_level_heading(line)
        };

        if heading.is_some_and(is_title_heading) {
            continue;
        }
        if !seen_content && !line.trim().is_empty() {
            seen_content = true;
            if heading.is_none() {
                lines.push(format!("# {}", categorized(stem)));
            }
        }

        match heading {
            Some(heading) => lines.push(format!("# {}", categorized(heading))),
            None => lines.push(line.to_string()),
        }
    }

    let mut out = lines.join("\n").trim_matches('\n').to_string();
    out.push('\n');
    out
}

fn categorized(heading: &str) -> String {
    if has_category_prefix(heading) {
        heading.to_string()
    } else {
        format!("{} - {heading}", infer_category(heading))
    }
}

fn write_batch(root: &Path, batch: &MonthBatch) -> KnowledgeResult<()> {
    let path = batch.file.path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut content = match fs::read_to_string(&path) {
        Ok(existing) => existing,
        Err(err) if err.kind() == ErrorKind::NotFound => title_line(&batch.file.title()),
        Err(err) => return Err(err.into()),
    };
    for chunk in &batch.chunks {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push('\n');
        content.push_str(chunk);
    }

    write_atomic(&path, content.as_bytes())
}
