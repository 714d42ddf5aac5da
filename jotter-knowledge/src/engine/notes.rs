use std::fs;

use tracing::info;

use crate::category::apply_category;
use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::index::Index;
use crate::models::{
    Alternative, AppendOutcome, AppendResult, NoteAppendRequest, NoteCreateRequest,
    NoteWriteResult,
};
use crate::parser::escape_user_text;
use crate::paths::FileRef;
use crate::search::{CONFIDENCE_THRESHOLD, Query, rank};
use crate::storage::{RootLock, append_new_entry, append_update};

use super::NotesEngine;

/// Candidates considered for an append.
const APPEND_CANDIDATES: usize = 5;
/// Alternatives returned when no candidate is confident.
const APPEND_ALTERNATIVES: usize = 3;

pub(crate) fn add(
    engine: &NotesEngine,
    request: NoteCreateRequest,
) -> KnowledgeResult<NoteWriteResult> {
    let (heading, category) = apply_category(&request.heading, request.category.as_deref())?;
    let body = escape_user_text(request.body.trim());
    let root = engine.root();

    fs::create_dir_all(root)?;
    let _lock = RootLock::acquire(root)?;
    let (mut index, _) = Index::load_or_build(root)?;

    let (file, content) = append_new_entry(root, &heading, &body, engine.today())?;
    index.patch_file(root, &file, &content)?;
    index.save(root)?;

    info!(file = %file.relative, heading = %heading, "added entry");
    Ok(NoteWriteResult {
        path: file.path(root),
        file: file.relative,
        heading,
        category,
    })
}

pub(crate) fn append(
    engine: &NotesEngine,
    request: NoteAppendRequest,
) -> KnowledgeResult<AppendOutcome> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(KnowledgeError::MissingField("text"));
    }
    let query = Query::parse(&request.search_term)
        .ok_or(KnowledgeError::MissingField("search_term"))?;

    let root = engine.root();
    let not_found = AppendOutcome::NotConfident {
        query: request.search_term.clone(),
        alternatives: Vec::new(),
    };
    if !root.is_dir() {
        return Ok(not_found);
    }

    let _lock = RootLock::acquire(root)?;
    let (mut index, _) = Index::load_or_build(root)?;
    let today = engine.today();

    let mut ranked = rank(&query, &index.entries, today);
    ranked.truncate(APPEND_CANDIDATES);

    let Some(top) = ranked.first() else {
        return Ok(not_found);
    };

    if top.score < CONFIDENCE_THRESHOLD {
        let alternatives = ranked
            .iter()
            .take(APPEND_ALTERNATIVES)
            .map(|candidate| Alternative {
                heading: candidate.item.heading.clone(),
                file: candidate.item.file.clone(),
                score: candidate.score,
            })
            .collect();
        return Ok(AppendOutcome::NotConfident {
            query: request.search_term,
            alternatives,
        });
    }

    let heading = top.item.heading.clone();
    let ordinal = top.item.ordinal;
    let score = top.score;
    let file = FileRef::from_relative(&top.item.file)
        .ok_or_else(|| KnowledgeError::UnknownEntry(heading.clone()))?;
    let runners_up: Vec<String> = ranked
        .iter()
        .skip(1)
        .take(APPEND_ALTERNATIVES - 1)
        .map(|candidate| candidate.item.heading.clone())
        .collect();

    let update = escape_user_text(text);
    let content = append_update(root, &file, &heading, ordinal, &update, today)?;
    index.patch_file(root, &file, &content)?;
    index.save(root)?;

    info!(file = %file.relative, heading = %heading, score, "appended update");
    Ok(AppendOutcome::Appended(AppendResult {
        heading,
        file: file.relative,
        score,
        date: today,
        alternatives: runners_up,
    }))
}
