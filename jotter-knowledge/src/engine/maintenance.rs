use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::index::Index;
use crate::models::{
    CleanIndexResult, ReindexResult, Severity, StorageInfo, ValidationIssue, ValidationReport,
};
use crate::parser::{parse_file, parse_title};
use crate::paths::{FileRef, INDEX_FILE_NAME, index_path, is_hidden, is_year_dir_name};
use crate::storage::{RootLock, TMP_SUFFIX};

use super::NotesEngine;

pub(crate) fn reindex(engine: &NotesEngine) -> KnowledgeResult<ReindexResult> {
    let root = engine.root();
    fs::create_dir_all(root)?;
    let _lock = RootLock::acquire(root)?;
    let index = Index::rebuild(root)?;
    Ok(reindex_result(root, &index))
}

fn reindex_result(root: &Path, index: &Index) -> ReindexResult {
    ReindexResult {
        total_files: index.total_files,
        total_entries: index.total_entries,
        index_path: index_path(root),
    }
}

pub(crate) fn clean_index(engine: &NotesEngine) -> KnowledgeResult<CleanIndexResult> {
    let root = engine.root();
    fs::create_dir_all(root)?;
    let _lock = RootLock::acquire(root)?;

    let index_file = index_path(root);
    let backup = if index_file.exists() {
        let backup = root.join(format!(
            "{INDEX_FILE_NAME}.bak-{}",
            Local::now().format("%Y%m%d%H%M%S")
        ));
        fs::copy(&index_file, &backup)
            .map_err(|err| KnowledgeError::Backup(format!("could not back up index: {err}")))?;
        Some(backup)
    } else {
        None
    };

    match Index::rebuild(root) {
        Ok(index) => {
            if let Some(backup) = &backup
                && let Err(err) = fs::remove_file(backup)
            {
                warn!(path = %backup.display(), error = %err, "failed to remove index backup");
            }
            info!(entries = index.total_entries, "index cleaned and rebuilt");
            Ok(CleanIndexResult {
                message: "Index cleaned and rebuilt".to_string(),
                reindex_result: reindex_result(root, &index),
            })
        }
        Err(err) => {
            if let Some(backup) = backup {
                restore_backup(&backup, &index_file, &err)?;
            }
            Err(err)
        }
    }
}

fn restore_backup(backup: &Path, index_file: &Path, cause: &KnowledgeError) -> KnowledgeResult<()> {
    match fs::rename(backup, index_file) {
        Ok(()) => {
            warn!(error = %cause, "index rebuild failed, previous index restored");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, backup = %backup.display(), "failed to restore index backup");
            Err(KnowledgeError::Backup(format!(
                "rebuild failed ({cause}) and the backup could not be restored: {err}"
            )))
        }
    }
}

pub(crate) fn storage_info(engine: &NotesEngine) -> StorageInfo {
    let root = engine.root();
    let index_file = index_path(root);
    let notes_dir_is_writable = fs::metadata(root)
        .map(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
        .unwrap_or(false);

    StorageInfo {
        notes_dir: root.to_path_buf(),
        notes_dir_exists: root.is_dir(),
        notes_dir_is_writable,
        index_exists: index_file.is_file(),
        index_file,
        current_month_file: FileRef::for_date(engine.today()).path(root),
    }
}

pub(crate) fn validate(engine: &NotesEngine) -> KnowledgeResult<ValidationReport> {
    let root = engine.root();
    let mut issues = Vec::new();
    let mut files_checked = 0;

    for (relative, path) in year_dir_files(root) {
        if relative.ends_with(TMP_SUFFIX) {
            issues.push(issue(&relative, "Leftover temporary file", Severity::Warning, None));
            continue;
        }
        if !relative.ends_with(".md") {
            continue;
        }
        files_checked += 1;
        check_file(&relative, &path, &mut issues);
    }

    Ok(ValidationReport {
        files_checked,
        issues_found: issues.len(),
        issues,
    })
}

/// Non-hidden files directly inside `<root>/<year>/`, sorted by path.
fn year_dir_files(root: &Path) -> Vec<(String, PathBuf)> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<(String, PathBuf)> = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let year = entry.path().parent()?.file_name()?.to_str()?.to_string();
            if !is_year_dir_name(&year) || is_hidden(&name) {
                return None;
            }
            Some((format!("{year}/{name}"), entry.into_path()))
        })
        .collect();
    files.sort();
    files
}

fn check_file(relative: &str, path: &Path, issues: &mut Vec<ValidationIssue>) {
    let Some(file) = FileRef::from_relative(relative) else {
        return;
    };
    if file.month.is_none() {
        issues.push(issue(
            relative,
            "File name does not follow MM-MonthName.md",
            Severity::Warning,
            None,
        ));
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            issues.push(issue(relative, &format!("Unreadable: {err}"), Severity::Error, None));
            return;
        }
    };
    let Ok(text) = String::from_utf8(bytes) else {
        issues.push(issue(relative, "Not valid UTF-8", Severity::Error, None));
        return;
    };
    if text.trim().is_empty() {
        issues.push(issue(relative, "Empty file", Severity::Warning, None));
        return;
    }

    let parsed = parse_file(&text);
    let first_line = text
        .lines()
        .position(|line| !line.trim().is_empty())
        .map(|idx| idx + 1);

    match (&parsed.title, parsed.title_line) {
        (Some(title), Some(line)) => {
            if Some(line) != first_line {
                issues.push(issue(
                    relative,
                    "Title line is not the first line",
                    Severity::Info,
                    Some(line),
                ));
            }
            if file.month.is_some()
                && parse_title(title) != file.month.map(|month| (file.year, month))
            {
                issues.push(issue(
                    relative,
                    &format!("Title '{title}' does not match the file's month"),
                    Severity::Warning,
                    Some(line),
                ));
            }
        }
        _ => issues.push(issue(relative, "Missing title line", Severity::Info, first_line)),
    }

    let mut seen = HashSet::new();
    for parsed_entry in &parsed.entries {
        if parsed_entry.entry.created.is_none() {
            issues.push(issue(
                relative,
                &format!("Entry '{}' has no valid Created date", parsed_entry.entry.heading),
                Severity::Info,
                Some(parsed_entry.line),
            ));
        }
        if !seen.insert(parsed_entry.entry.heading.as_str()) {
            issues.push(issue(
                relative,
                &format!("Duplicate heading '{}'", parsed_entry.entry.heading),
                Severity::Warning,
                Some(parsed_entry.line),
            ));
        }
    }
}

fn issue(file: &str, text: &str, severity: Severity, line: Option<usize>) -> ValidationIssue {
    ValidationIssue {
        file: file.to_string(),
        issue: text.to_string(),
        severity,
        line,
    }
}
