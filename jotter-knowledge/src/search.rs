use std::borrow::Cow;

use chrono::NaiveDate;

use crate::index::IndexRecord;
use crate::models::Entry;

/// Minimum score for `append` to act on the top match.
pub const CONFIDENCE_THRESHOLD: i64 = 50;

const HEADING_PHRASE: i64 = 500;
const HEADING_ALL_TERMS: i64 = 100;
const HEADING_TERM: i64 = 20;
const CONTENT_OCCURRENCE: i64 = 5;
const CONTENT_CAP: i64 = 50;

/// Anything the relevance engine can rank.
pub trait Scorable {
    fn heading(&self) -> &str;
    fn content(&self) -> Cow<'_, str>;
    fn date(&self) -> Option<NaiveDate>;
}

impl Scorable for Entry {
    fn heading(&self) -> &str {
        &self.heading
    }

    fn content(&self) -> Cow<'_, str> {
        Cow::Owned(self.search_text())
    }

    fn date(&self) -> Option<NaiveDate> {
        self.last_date()
    }
}

impl Scorable for IndexRecord {
    fn heading(&self) -> &str {
        &self.heading
    }

    fn content(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

/// A normalised search query: the lowercased phrase and its distinct terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub phrase: String,
    pub terms: Vec<String>,
}

impl Query {
    /// `None` for a blank query.
    pub fn parse(raw: &str) -> Option<Self> {
        let phrase = raw.trim().to_lowercase();
        if phrase.is_empty() {
            return None;
        }
        let mut terms: Vec<String> = Vec::new();
        for term in phrase.split_whitespace() {
            if !terms.iter().any(|seen| seen == term) {
                terms.push(term.to_string());
            }
        }
        Some(Self { phrase, terms })
    }
}

/// Individual contributions to a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub heading: i64,
    pub content: i64,
    pub recency: i64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i64 {
        self.heading + self.content + self.recency
    }
}

pub fn score<T: Scorable + ?Sized>(query: &Query, item: &T, today: NaiveDate) -> i64 {
    score_breakdown(query, item, today).total()
}

pub fn score_breakdown<T: Scorable + ?Sized>(
    query: &Query,
    item: &T,
    today: NaiveDate,
) -> ScoreBreakdown {
    let heading = item.heading().to_lowercase();
    let heading_score = if heading.contains(&query.phrase) {
        HEADING_PHRASE
    } else if query.terms.iter().all(|term| heading.contains(term.as_str())) {
        HEADING_ALL_TERMS
    } else {
        query
            .terms
            .iter()
            .filter(|term| heading.contains(term.as_str()))
            .count() as i64
            * HEADING_TERM
    };

    let content = item.content().to_lowercase();
    let occurrences: usize = query
        .terms
        .iter()
        .map(|term| content.matches(term.as_str()).count())
        .sum();
    let content_score = (occurrences as i64 * CONTENT_OCCURRENCE).min(CONTENT_CAP);

    ScoreBreakdown {
        heading: heading_score,
        content: content_score,
        recency: item.date().map_or(0, |date| recency_bonus(date, today)),
    }
}

/// Bonus for recently touched entries.
pub fn recency_bonus(date: NaiveDate, today: NaiveDate) -> i64 {
    match (today - date).num_days() {
        days if days < 30 => 10,
        days if days < 90 => 5,
        days if days < 180 => 2,
        _ => 0,
    }
}

/// A candidate with its score and its position in the input.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'a, T> {
    pub item: &'a T,
    pub score: i64,
    pub position: usize,
}

/// Score every candidate and keep the positive ones, best first. Ties go to
/// the most recent date, then to input order.
pub fn rank<'a, T: Scorable>(
    query: &Query,
    candidates: &'a [T],
    today: NaiveDate,
) -> Vec<Ranked<'a, T>> {
    let mut ranked: Vec<Ranked<'a, T>> = candidates
        .iter()
        .enumerate()
        .map(|(position, item)| Ranked {
            item,
            score: score(query, item, today),
            position,
        })
        .filter(|ranked| ranked.score > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.item.date().cmp(&a.item.date()))
            .then(a.position.cmp(&b.position))
    });
    ranked
}
