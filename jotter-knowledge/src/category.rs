use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::parser::is_title_heading;

pub const DEFAULT_CATEGORY: &str = "Note";

/// Keyword table in priority order; the first category with a hit wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Work",
        &[
            "develop",
            "fix",
            "build",
            "deploy",
            "setup",
            "configure",
            "move",
            "install",
            "update",
            "upgrade",
            "migrate",
            "implement",
            "create",
            "debug",
            "troubleshoot",
            "optimize",
            "refactor",
            "test",
            "release",
            "adapter",
            "aws",
            "dns",
            "server",
            "machine",
        ],
    ),
    (
        "Meeting",
        &["meeting", "discussion", "call", "sync", "standup", "retrospective"],
    ),
    (
        "Health",
        &[
            "scan",
            "results",
            "appointment",
            "ct",
            "doctor",
            "medical",
            "health",
            "chest",
            "contrast",
            "mri",
            "xray",
        ],
    ),
    (
        "Learning",
        &[
            "learn",
            "tutorial",
            "research",
            "study",
            "skills",
            "course",
            "training",
            "documentation",
            "guide",
            "ai",
        ],
    ),
    (
        "Idea",
        &["idea", "concept", "proposal", "brainstorm", "think", "consider"],
    ),
    (
        "Decision",
        &[
            "decided",
            "chose",
            "selected",
            "cancel",
            "cancelled",
            "approved",
            "rejected",
            "accepted",
        ],
    ),
    ("Task", &["todo", "task", "action", "need to", "should", "must"]),
];

static PREFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+) - \S").expect("category prefix regex"));

static CATEGORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("category name regex"));

/// Infer a category from heading text. Short keywords (two letters) must be
/// whole words; longer ones match at the start of a word.
pub fn infer_category(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|keyword| keyword_hit(&words, keyword)) {
            return category;
        }
    }
    DEFAULT_CATEGORY
}

fn keyword_hit(words: &[&str], keyword: &str) -> bool {
    if keyword.contains(' ') {
        let padded = format!(" {} ", words.join(" "));
        return padded.contains(&format!(" {keyword} "));
    }
    if keyword.len() <= 2 {
        return words.contains(&keyword);
    }
    words.iter().any(|word| word.starts_with(keyword))
}

pub fn has_category_prefix(heading: &str) -> bool {
    PREFIXED.is_match(heading)
}

/// Category prefix of a `"<Word> - <text>"` heading.
pub fn category_of(heading: &str) -> Option<&str> {
    PREFIXED
        .captures(heading)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Normalise a heading for a new entry.
///
/// Returns the final heading and its category. Headings already in
/// `<Word> - <text>` form are kept; otherwise the explicit category, or the
/// inferred one, is prefixed.
pub fn apply_category(heading: &str, explicit: Option<&str>) -> KnowledgeResult<(String, String)> {
    let heading = heading.trim();
    if heading.is_empty() {
        return Err(KnowledgeError::MissingField("heading"));
    }
    if heading.contains(['\n', '\r']) {
        return Err(KnowledgeError::InvalidField {
            field: "heading",
            reason: "must be a single line".to_string(),
        });
    }

    let (heading, category) = match category_of(heading) {
        Some(category) => (heading.to_string(), category.to_string()),
        None => {
            let category = match explicit.map(str::trim).filter(|c| !c.is_empty()) {
                Some(category) if CATEGORY_NAME.is_match(category) => category.to_string(),
                Some(_) => {
                    return Err(KnowledgeError::InvalidField {
                        field: "category",
                        reason: "must be a single word".to_string(),
                    });
                }
                None => infer_category(heading).to_string(),
            };
            (format!("{category} - {heading}"), category)
        }
    };

    if is_title_heading(&heading) {
        return Err(KnowledgeError::InvalidField {
            field: "heading",
            reason: "collides with the monthly title line".to_string(),
        });
    }

    Ok((heading, category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_in_priority_order() {
        assert_eq!(infer_category("Fix cache invalidation bug"), "Work");
        assert_eq!(infer_category("Weekly standup"), "Meeting");
        assert_eq!(infer_category("Doctor appointment"), "Health");
        assert_eq!(infer_category("Rust tutorial"), "Learning");
        assert_eq!(infer_category("Brainstorm names"), "Idea");
        assert_eq!(infer_category("We decided on Postgres"), "Decision");
        assert_eq!(infer_category("Need to buy milk"), "Task");
        assert_eq!(infer_category("Sunday walk"), "Note");
        // "meeting about a deploy" hits Work first.
        assert_eq!(infer_category("Meeting about the deploy"), "Work");
    }

    #[test]
    fn short_keywords_need_whole_words() {
        assert_eq!(infer_category("CT scan"), "Health");
        assert_eq!(infer_category("Act one"), "Note");
        assert_eq!(infer_category("AI reading list"), "Learning");
        assert_eq!(infer_category("Paid the bill"), "Note");
    }

    #[test]
    fn detects_existing_prefix() {
        assert!(has_category_prefix("Work - Fix cache"));
        assert!(!has_category_prefix("Fix cache - part two"));
        assert_eq!(category_of("Idea - Garden"), Some("Idea"));
        assert_eq!(category_of("No prefix here"), None);
    }

    #[test]
    fn apply_category_keeps_or_prefixes() {
        let (heading, category) = apply_category("Work - Fix cache", Some("Idea")).unwrap();
        assert_eq!(heading, "Work - Fix cache");
        assert_eq!(category, "Work");

        let (heading, category) = apply_category("  Garden planner ", Some("Idea")).unwrap();
        assert_eq!(heading, "Idea - Garden planner");
        assert_eq!(category, "Idea");

        let (heading, _) = apply_category("Deploy the server", None).unwrap();
        assert_eq!(heading, "Work - Deploy the server");
    }

    #[test]
    fn apply_category_rejects_bad_input() {
        assert!(matches!(
            apply_category("   ", None),
            Err(KnowledgeError::MissingField("heading"))
        ));
        assert!(matches!(
            apply_category("November 2025", Some("Notes")),
            Err(KnowledgeError::InvalidField { field: "heading", .. })
        ));
        assert!(matches!(
            apply_category("Garden", Some("Home Improvement")),
            Err(KnowledgeError::InvalidField { field: "category", .. })
        ));
        assert!(apply_category("Two\nlines", None).is_err());
    }
}
