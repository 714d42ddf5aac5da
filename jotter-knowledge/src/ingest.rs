use std::collections::HashMap;

use crate::category::category_of;
use crate::index::IndexRecord;
use crate::parser::{ParsedEntry, parse_file};
use crate::paths::FileRef;

pub const PREVIEW_CHARS: usize = 100;
pub const MAX_KEYWORDS: usize = 10;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "that", "with", "this", "from", "have", "was", "were", "are", "but",
    "not", "you", "all", "any", "can", "had", "her", "his", "him", "its", "our", "out", "who",
    "has", "how", "into", "than", "then", "them", "they", "there", "these", "those", "what",
    "when", "which", "will", "would", "about", "been", "also",
];

/// Derive index records for every entry in one monthly file.
pub fn records_for_file(file: &FileRef, text: &str) -> Vec<IndexRecord> {
    parse_file(text)
        .entries
        .iter()
        .enumerate()
        .map(|(ordinal, parsed)| record_for_entry(file, ordinal, parsed))
        .collect()
}

fn record_for_entry(file: &FileRef, ordinal: usize, parsed: &ParsedEntry) -> IndexRecord {
    let entry = &parsed.entry;
    let text = entry.search_text();
    let updated = entry.last_update();
    let date = entry
        .last_date()
        .or_else(|| file.month_start())
        .unwrap_or_default();

    IndexRecord {
        heading: entry.heading.clone(),
        category: category_of(&entry.heading).map(str::to_string),
        file: file.relative.clone(),
        ordinal,
        line: parsed.line,
        created: entry.created,
        updated,
        date,
        content_preview: preview(&entry.body, PREVIEW_CHARS),
        keywords: keywords(&format!("{} {}", entry.heading, text), MAX_KEYWORDS),
        text,
    }
}

/// First `max_chars` characters of `text`, trimmed.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Most frequent words of three or more letters, stopwords excluded.
/// Ordered by count, then alphabetically, so rebuilds are deterministic.
pub fn keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| word.len() >= 3)
    {
        let word = word.to_ascii_lowercase();
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}
