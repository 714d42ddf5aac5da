use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use fs4::fs_std::FileExt;
use fs4::lock_contended_error;
use tracing::{debug, warn};

use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::parser::{insert_update, parse_file, render_entry, title_line};
use crate::paths::{FileRef, lock_path};

pub const TMP_SUFFIX: &str = ".tmp";

/// `<name>.tmp` next to `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

/// First half of an atomic replace: the new content is fully written and
/// synced to `<name>.tmp`, the target is untouched until [`commit`].
///
/// Dropping an uncommitted write removes the temp file.
///
/// [`commit`]: StagedWrite::commit
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    tmp: PathBuf,
    committed: bool,
}

impl StagedWrite {
    pub fn stage(target: &Path, content: &[u8]) -> KnowledgeResult<Self> {
        Self::stage_via(target, tmp_path(target), content)
    }

    /// Stage through an explicit temp path.
    pub fn stage_via(target: &Path, tmp: PathBuf, content: &[u8]) -> KnowledgeResult<Self> {
        let mut file = File::create(&tmp)?;
        let staged = Self {
            target: target.to_path_buf(),
            tmp,
            committed: false,
        };
        file.write_all(content)?;
        file.sync_all()?;
        Ok(staged)
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp
    }

    pub fn commit(mut self) -> KnowledgeResult<()> {
        fs::rename(&self.tmp, &self.target)?;
        self.committed = true;
        sync_parent(&self.target);
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed
            && let Err(err) = fs::remove_file(&self.tmp)
            && err.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.tmp.display(), error = %err, "failed to remove staged file");
        }
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(err) = File::open(parent).and_then(|dir| dir.sync_all())
    {
        debug!(path = %parent.display(), error = %err, "directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

/// Replace `path` with `content` via write-temp-then-rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> KnowledgeResult<()> {
    StagedWrite::stage(path, content)?.commit()
}

/// Advisory single-writer lock on a storage root.
///
/// An OS file lock on `<root>/.lock`, so a writer that dies releases it with
/// its file handle. The file itself stays behind and records the last
/// holder's PID and acquisition time.
#[derive(Debug)]
pub struct RootLock {
    path: PathBuf,
    file: File,
}

impl RootLock {
    pub fn acquire(root: &Path) -> KnowledgeResult<Self> {
        let path = lock_path(root);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(err) if err.raw_os_error() == lock_contended_error().raw_os_error() => {
                return Err(KnowledgeError::Locked(path));
            }
            Err(err) => return Err(err.into()),
        }

        file.set_len(0)?;
        writeln!(
            file,
            "pid={}\nacquired={}",
            std::process::id(),
            Local::now().to_rfc3339()
        )?;
        debug!(path = %path.display(), "acquired root lock");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %err, "failed to release root lock");
        }
    }
}

/// Read a monthly file, treating invalid UTF-8 as an I/O error.
pub fn read_text(path: &Path) -> KnowledgeResult<String> {
    Ok(fs::read_to_string(path)?)
}

/// Append a new entry to the monthly file for `today`, creating the file
/// (with its title line) when needed. Returns the file and its new content.
pub fn append_new_entry(
    root: &Path,
    heading: &str,
    body: &str,
    today: NaiveDate,
) -> KnowledgeResult<(FileRef, String)> {
    let file = FileRef::for_date(today);
    let path = file.path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut content = match fs::read_to_string(&path) {
        Ok(existing) => existing,
        Err(err) if err.kind() == ErrorKind::NotFound => title_line(&file.title()),
        Err(err) => return Err(err.into()),
    };
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&render_entry(heading, body, today));

    write_atomic(&path, content.as_bytes())?;
    debug!(file = %file.relative, heading, "appended entry");
    Ok((file, content))
}

/// Insert an update into an existing entry. The `ordinal` picks among
/// duplicate headings; when it no longer points at `heading` the first
/// matching heading is used. Returns the file's new content.
pub fn append_update(
    root: &Path,
    file: &FileRef,
    heading: &str,
    ordinal: usize,
    text: &str,
    today: NaiveDate,
) -> KnowledgeResult<String> {
    let path = file.path(root);
    let current = read_text(&path)?;
    let parsed = parse_file(&current);

    let target = parsed
        .entries
        .get(ordinal)
        .filter(|candidate| candidate.entry.heading == heading)
        .or_else(|| {
            parsed
                .entries
                .iter()
                .find(|candidate| candidate.entry.heading == heading)
        })
        .ok_or_else(|| KnowledgeError::UnknownEntry(heading.to_string()))?;

    let updated = insert_update(&current, &target.span, today, text);
    write_atomic(&path, updated.as_bytes())?;
    debug!(file = %file.relative, heading, ordinal, "appended update");
    Ok(updated)
}
