use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

pub use jotter_core::paths::{INDEX_FILE_NAME, LOCK_FILE_NAME, index_path, lock_path};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English name of a 1-based month.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get((month as usize).checked_sub(1)?).copied()
}

/// 1-based month for an English month name (case-sensitive).
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .map(|idx| idx as u32 + 1)
}

/// A monthly file, addressed relative to the storage root.
///
/// `relative` always uses `/` separators so index keys are identical across
/// platforms. `month` is `None` for markdown files in a year directory whose
/// name does not follow the `MM-MonthName.md` convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub relative: String,
    pub year: i32,
    pub month: Option<u32>,
}

impl FileRef {
    /// The canonical monthly file for a date.
    pub fn for_month(year: i32, month: u32) -> Self {
        let name = month_name(month).unwrap_or("Unknown");
        Self {
            relative: format!("{year}/{month:02}-{name}.md"),
            year,
            month: Some(month),
        }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_month(date.year(), date.month())
    }

    /// Parse an index key such as `2025/11-November.md`.
    pub fn from_relative(relative: &str) -> Option<Self> {
        let (year, file_name) = relative.split_once('/')?;
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let year = year.parse().ok()?;
        Some(Self {
            relative: relative.to_string(),
            year,
            month: parse_month_file_name(file_name),
        })
    }

    pub fn path(&self, root: &Path) -> PathBuf {
        self.relative
            .split('/')
            .fold(root.to_path_buf(), |path, part| path.join(part))
    }

    /// First day of the file's month; January when the month is unknown.
    pub fn month_start(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), 1)
    }

    /// Title line text (without the `# ` marker) for this file's month.
    pub fn title(&self) -> String {
        let name = self.month.and_then(month_name).unwrap_or("Unknown");
        format!("Notes - {} {}", name, self.year)
    }

    /// Newest year first, then newest month, then name descending.
    pub fn newest_first(&self, other: &Self) -> Ordering {
        other
            .year
            .cmp(&self.year)
            .then(other.month.cmp(&self.month))
            .then(other.relative.cmp(&self.relative))
    }
}

/// Month of a `MM-MonthName.md` file name when the number and the name agree.
pub fn parse_month_file_name(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(".md")?;
    let (number, name) = stem.split_once('-')?;
    if number.len() != 2 {
        return None;
    }
    let month: u32 = number.parse().ok()?;
    (month_name(month)? == name).then_some(month)
}

pub(crate) fn is_year_dir_name(name: &str) -> bool {
    name.len() == 4 && name.chars().all(|c| c.is_ascii_digit())
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// All markdown files under `<root>/<year>/`, newest year first and newest
/// month first within a year.
pub fn list_monthly_files(root: &Path) -> Vec<FileRef> {
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<FileRef> = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            match entry.depth() {
                0 => true,
                1 => entry.file_type().is_dir() && is_year_dir_name(&name),
                _ => !is_hidden(&name),
            }
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !name.ends_with(".md") {
                return None;
            }
            let year = entry.path().parent()?.file_name()?.to_str()?.to_string();
            FileRef::from_relative(&format!("{year}/{name}"))
        })
        .collect();

    files.sort_by(FileRef::newest_first);
    files
}
