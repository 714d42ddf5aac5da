use std::ops::Range;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{Entry, EntryUpdate};
use crate::paths::month_number;

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Notes - (January|February|March|April|May|June|July|August|September|October|November|December) (\d{4})$",
    )
    .expect("title regex")
});

static CREATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*Created:\*\*\s*(.*?)\s*$").expect("created regex"));

static UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\*Update \((\d{4}-\d{2}-\d{2})\):\*\*\s?(.*)$").expect("update regex")
});

const DATE_FORMAT: &str = "%Y-%m-%d";

/// An entry together with where it sits in the file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub entry: Entry,
    /// 1-based line of the entry heading.
    pub line: usize,
    /// Byte range from the heading to the next top-level heading or EOF.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    /// Text of the first title heading, without the `# ` marker.
    pub title: Option<String>,
    pub title_line: Option<usize>,
    pub entries: Vec<ParsedEntry>,
}

impl ParsedFile {
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries.into_iter().map(|parsed| parsed.entry).collect()
    }
}

/// True for the structural `Notes - <Month> <Year>` heading.
pub fn is_title_heading(heading: &str) -> bool {
    TITLE.is_match(heading.trim())
}

/// `(year, month)` named by a title heading.
pub fn parse_title(heading: &str) -> Option<(i32, u32)> {
    let caps = TITLE.captures(heading.trim())?;
    let month = month_number(caps.get(1)?.as_str())?;
    let year = caps.get(2)?.as_str().parse().ok()?;
    Some((year, month))
}

/// First line of a new monthly file, followed by a blank line.
pub fn title_line(title: &str) -> String {
    format!("# {title}\n\n")
}

pub fn parse(text: &str) -> Vec<Entry> {
    parse_file(text).into_entries()
}

/// Split a monthly file into entries.
///
/// Never fails: malformed markers degrade to `None` dates or plain text, and
/// title headings are dropped along with any lines that follow them until the
/// next real entry.
pub fn parse_file(text: &str) -> ParsedFile {
    let mut parsed = ParsedFile::default();
    let mut current: Option<(String, usize, usize)> = None;
    let mut fence: Option<&'static str> = None;
    let mut offset = 0;

    for (idx, raw_line) in text.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw_line.len();

        let line = raw_line.trim_end_matches(['\n', '\r']);
        if update_fence(&mut fence, line) {
            continue;
        }

        let Some(heading) = top_level_heading(line) else {
            continue;
        };

        if let Some((heading, line_no, start)) = current.take() {
            parsed
                .entries
                .push(build_entry(text, heading, line_no, start..line_start));
        }

        if is_title_heading(heading) {
            if parsed.title.is_none() {
                parsed.title = Some(heading.to_string());
                parsed.title_line = Some(idx + 1);
            }
            continue;
        }

        current = Some((heading.to_string(), idx + 1, line_start));
    }

    if let Some((heading, line_no, start)) = current {
        parsed
            .entries
            .push(build_entry(text, heading, line_no, start..text.len()));
    }

    parsed
}

/// Tracks fenced code blocks. Returns true while the line is a fence marker
/// or inside a fence.
pub(crate) fn update_fence(fence: &mut Option<&'static str>, line: &str) -> bool {
    let trimmed = line.trim_start();
    let marker = ["```", "~~~"]
        .into_iter()
        .find(|marker| trimmed.starts_with(marker));

    match (*fence, marker) {
        (Some(open), Some(marker)) if open == marker => {
            *fence = None;
            true
        }
        (Some(_), _) => true,
        (None, Some(marker)) => {
            *fence = Some(marker);
            true
        }
        (None, None) => false,
    }
}

pub(crate) fn top_level_heading(line: &str) -> Option<&str> {
    let heading = line.strip_prefix("# ")?.trim();
    (!heading.is_empty()).then_some(heading)
}

fn build_entry(text: &str, heading: String, line: usize, span: Range<usize>) -> ParsedEntry {
    let section = &text[span.clone()];
    let mut body_lines: Vec<&str> = Vec::new();
    let mut created: Option<NaiveDate> = None;
    let mut created_seen = false;
    let mut updates: Vec<(NaiveDate, Vec<&str>)> = Vec::new();
    let mut fence: Option<&'static str> = None;

    // Skip the heading line itself.
    for raw_line in section.split_inclusive('\n').skip(1) {
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let in_fence = update_fence(&mut fence, line);

        if !in_fence {
            if !created_seen && let Some(caps) = CREATED.captures(line) {
                created_seen = true;
                created = caps
                    .get(1)
                    .and_then(|m| NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT).ok());
                continue;
            }

            if let Some(caps) = UPDATE.captures(line)
                && let Some(date) = caps
                    .get(1)
                    .and_then(|m| NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT).ok())
            {
                let first = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                updates.push((date, vec![first]));
                continue;
            }
        }

        match updates.last_mut() {
            Some((_, lines)) => lines.push(line),
            None => body_lines.push(line),
        }
    }

    let entry = Entry {
        heading,
        body: tidy(&body_lines),
        created,
        updates: updates
            .into_iter()
            .map(|(date, lines)| EntryUpdate {
                date,
                text: tidy(&lines),
            })
            .collect(),
    };

    ParsedEntry { entry, line, span }
}

/// Join lines, dropping leading and trailing blank ones.
fn tidy(lines: &[&str]) -> String {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |idx| idx + 1);
    lines[start..end].join("\n")
}

/// Render a freshly created entry.
pub fn render_entry(heading: &str, body: &str, created: NaiveDate) -> String {
    format!(
        "\n# {heading}\n{body}\n\n**Created:** {}\n",
        created.format(DATE_FORMAT)
    )
}

pub fn render_update(date: NaiveDate, text: &str) -> String {
    format!("\n**Update ({}):** {text}\n", date.format(DATE_FORMAT))
}

/// Render an entry with its full update history.
pub fn render(entry: &Entry) -> String {
    let created = entry.created.map(|date| date.format(DATE_FORMAT).to_string());
    let mut out = match created {
        Some(created) => format!(
            "\n# {}\n{}\n\n**Created:** {created}\n",
            entry.heading, entry.body
        ),
        None => format!("\n# {}\n{}\n", entry.heading, entry.body),
    };
    for update in &entry.updates {
        out.push_str(&render_update(update.date, &update.text));
    }
    out
}

/// Insert an update after the last non-blank line of the entry at `span`.
pub fn insert_update(text: &str, span: &Range<usize>, date: NaiveDate, update: &str) -> String {
    let section = &text[span.clone()];
    let cut = span.start + section.trim_end().len();

    let mut out = String::with_capacity(text.len() + update.len() + 32);
    out.push_str(&text[..cut]);
    out.push('\n');
    out.push_str(&render_update(date, update));
    if span.end < text.len() {
        out.push('\n');
    }
    out.push_str(&text[span.end..]);
    out
}

/// Neutralise structural lines in user text: top-level headings are demoted
/// and `**Created:**` / `**Update (..):**` markers are escaped, so the text
/// can neither start an entry nor change an entry's dates.
pub fn escape_user_text(text: &str) -> String {
    let mut fence: Option<&'static str> = None;
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        if update_fence(&mut fence, line) {
            out.push(line.to_string());
        } else if line.starts_with("# ") {
            out.push(format!("#{line}"));
        } else if CREATED.is_match(line) || UPDATE.is_match(line) {
            out.push(format!("\\{line}"));
        } else {
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = "# Notes - November 2025\n\
\n\
# Work - Fix cache bug\n\
Cache invalidation was off by one.\n\
\n\
**Created:** 2025-11-03\n\
\n\
**Update (2025-11-05):** Deployed the fix.\n\
\n\
# Idea - Garden planner\n\
Plan raised beds.\n\
\n\
**Created:** 2025-11-10\n";

    #[test]
    fn parses_entries_and_skips_title() {
        let parsed = parse_file(SAMPLE);
        assert_eq!(parsed.title.as_deref(), Some("Notes - November 2025"));
        assert_eq!(parsed.title_line, Some(1));
        assert_eq!(parsed.entries.len(), 2);

        let first = &parsed.entries[0];
        assert_eq!(first.entry.heading, "Work - Fix cache bug");
        assert_eq!(first.entry.body, "Cache invalidation was off by one.");
        assert_eq!(first.entry.created, Some(date(2025, 11, 3)));
        assert_eq!(first.entry.updates.len(), 1);
        assert_eq!(first.entry.updates[0].text, "Deployed the fix.");
        assert_eq!(first.line, 3);

        let second = &parsed.entries[1];
        assert_eq!(second.entry.heading, "Idea - Garden planner");
        assert!(second.entry.updates.is_empty());
        assert_eq!(second.span.end, SAMPLE.len());
    }

    #[test]
    fn render_then_parse_round_trips() {
        let mut entry = Entry::new("Learning - Rust lifetimes", "Borrowck notes.\n\n- one\n- two", date(2025, 2, 1));
        entry.updates.push(EntryUpdate {
            date: date(2025, 2, 3),
            text: "Read the nomicon chapter.".to_string(),
        });
        entry.updates.push(EntryUpdate {
            date: date(2025, 2, 9),
            text: "Second pass.\nWith a continuation line.".to_string(),
        });

        let text = format!("{}{}", title_line("Notes - February 2025"), render(&entry));
        let parsed = parse(&text);
        assert_eq!(parsed, vec![entry]);
    }

    #[test]
    fn malformed_created_is_tolerated() {
        let text = "# Task - Something\nbody\n\n**Created:** someday\n";
        let entries = parse(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].created, None);
        assert_eq!(entries[0].body, "body");
    }

    #[test]
    fn malformed_update_stays_as_text() {
        let text = "# Task - Something\nbody\n\n**Created:** 2025-01-01\n\n**Update (2025-13-40):** nope\n";
        let entries = parse(text);
        assert!(entries[0].updates.is_empty());
        assert!(entries[0].body.contains("**Update (2025-13-40):** nope"));
    }

    #[test]
    fn only_first_created_marker_counts() {
        let text = "# Note - x\n**Created:** 2025-01-01\n**Created:** 2025-02-02\n";
        let entries = parse(text);
        assert_eq!(entries[0].created, Some(date(2025, 1, 1)));
        assert_eq!(entries[0].body, "**Created:** 2025-02-02");
    }

    #[test]
    fn subheadings_and_fenced_hashes_stay_in_body() {
        let text = "# Note - Script\n## Details\n```sh\n# not a heading\n```\n\n**Created:** 2025-01-01\n";
        let entries = parse(text);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].body.contains("# not a heading"));
        assert!(entries[0].body.contains("## Details"));
    }

    #[test]
    fn repeated_title_lines_are_dropped() {
        let text = "# Notes - May 2024\n\n# Note - a\nA\n\n# Notes - May 2024\nstray line\n\n# Note - b\nB\n";
        let parsed = parse_file(text);
        let headings: Vec<_> = parsed
            .entries
            .iter()
            .map(|p| p.entry.heading.as_str())
            .collect();
        assert_eq!(headings, vec!["Note - a", "Note - b"]);
        assert!(!parsed.entries[0].entry.body.contains("stray"));
    }

    #[test]
    fn title_pattern_is_strict() {
        assert!(is_title_heading("Notes - November 2025"));
        assert!(!is_title_heading("Notes - november 2025"));
        assert!(!is_title_heading("Notes - Smarch 2025"));
        assert!(!is_title_heading("Work - Notes - November 2025"));
        assert_eq!(parse_title("Notes - March 2024"), Some((2024, 3)));
    }

    #[test]
    fn insert_update_lands_before_next_heading() {
        let parsed = parse_file(SAMPLE);
        let span = &parsed.entries[0].span;
        let updated = insert_update(SAMPLE, span, date(2025, 11, 20), "Closed the ticket.");

        let reparsed = parse_file(&updated);
        assert_eq!(reparsed.entries.len(), 2);
        let updates = &reparsed.entries[0].entry.updates;
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].text, "Closed the ticket.");
        assert_eq!(reparsed.entries[1].entry, parsed.entries[1].entry);
        assert!(updated.contains("Closed the ticket.\n\n# Idea - Garden planner"));
    }

    #[test]
    fn insert_update_at_end_of_file() {
        let parsed = parse_file(SAMPLE);
        let span = &parsed.entries[1].span;
        let updated = insert_update(SAMPLE, span, date(2025, 11, 20), "Bought soil.");
        assert!(updated.ends_with("**Created:** 2025-11-10\n\n**Update (2025-11-20):** Bought soil.\n"));
    }

    #[test]
    fn demotes_top_level_headings_outside_fences() {
        let text = "# Inner\ntext\n```\n# kept\n```\n## Sub";
        assert_eq!(escape_user_text(text), "## Inner\ntext\n```\n# kept\n```\n## Sub");
    }

    #[test]
    fn escaped_date_markers_do_not_parse_as_dates() {
        let body =
            escape_user_text("pasted:\n**Created:** 2019-01-01\n**Update (2019-02-02):** old");
        assert_eq!(
            body,
            "pasted:\n\\**Created:** 2019-01-01\n\\**Update (2019-02-02):** old"
        );

        let text = format!(
            "{}{}",
            title_line("Notes - November 2025"),
            render_entry("Note - Paste", &body, date(2025, 11, 20))
        );
        let entries = parse(&text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].created, Some(date(2025, 11, 20)));
        assert!(entries[0].updates.is_empty());
        assert_eq!(entries[0].body, body);
    }
}
