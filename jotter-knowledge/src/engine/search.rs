use std::collections::{BTreeMap, HashMap};

use crate::errors::KnowledgeResult;
use crate::models::{DateRange, KeywordCount, SearchHit, StatsReport};
use crate::paths::index_path;
use crate::search::{Query, rank};

use super::NotesEngine;

const UNCATEGORIZED: &str = "Uncategorized";
const TOP_KEYWORDS: usize = 10;

pub(crate) fn search(
    engine: &NotesEngine,
    query: &str,
    max_results: Option<usize>,
) -> KnowledgeResult<Vec<SearchHit>> {
    let Some(query) = Query::parse(query) else {
        return Ok(Vec::new());
    };

    let index = engine.read_index()?;
    let limit = max_results.unwrap_or(engine.settings().max_results);
    let preview_chars = engine.settings().preview_chars;

    let hits = rank(&query, &index.entries, engine.today())
        .into_iter()
        .take(limit)
        .map(|ranked| SearchHit {
            heading: ranked.item.heading.clone(),
            content: truncate(&ranked.item.text, preview_chars),
            file: ranked.item.file.clone(),
            date: ranked.item.date,
            category: ranked.item.category.clone(),
            score: ranked.score,
        })
        .collect();
    Ok(hits)
}

/// Cut `text` to `max_chars`, marking the cut with `...`.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub(crate) fn stats(engine: &NotesEngine) -> KnowledgeResult<StatsReport> {
    let index = engine.read_index()?;

    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut keyword_counts: HashMap<&str, usize> = HashMap::new();
    for record in &index.entries {
        let category = record.category.as_deref().unwrap_or(UNCATEGORIZED);
        *categories.entry(category.to_string()).or_default() += 1;
        for keyword in &record.keywords {
            *keyword_counts.entry(keyword.as_str()).or_default() += 1;
        }
    }

    let mut top_keywords: Vec<KeywordCount> = keyword_counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount {
            keyword: keyword.to_string(),
            count,
        })
        .collect();
    top_keywords.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    top_keywords.truncate(TOP_KEYWORDS);

    let earliest = index.entries.iter().map(|record| record.date).min();
    let latest = index.entries.iter().map(|record| record.date).max();
    let date_range = earliest
        .zip(latest)
        .map(|(earliest, latest)| DateRange { earliest, latest });

    Ok(StatsReport {
        total_entries: index.total_entries,
        total_files: index.total_files,
        categories,
        date_range,
        top_keywords,
        index_path: index_path(engine.root()),
    })
}
