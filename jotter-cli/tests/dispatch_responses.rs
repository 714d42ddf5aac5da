//! Response shapes of every command, driven through `Context::dispatch`.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use insta::{assert_json_snapshot, with_settings};
use serde_json::{Value, json};
use tempfile::TempDir;

use jotter_cli::{Context, Request, Response, run};
use jotter_core::{Config, HostDirs, ResolvedRoot, RootSource, Settings};
use jotter_knowledge::storage::RootLock;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 20).unwrap()
}

fn context_with(root: &Path, settings: Settings) -> Context {
    let root = ResolvedRoot {
        path: root.to_path_buf(),
        source: RootSource::Explicit,
    };
    Context::new(Config::with_root(settings, root), HostDirs::default()).with_today(today())
}

fn context(root: &Path) -> Context {
    context_with(root, Settings::default())
}

fn add(context: &Context, heading: &str, body: &str) -> Response {
    context.dispatch(Request::Add {
        heading: heading.to_string(),
        body: body.to_string(),
        category: None,
    })
}

fn append(context: &Context, search_term: &str, text: &str) -> Response {
    context.dispatch(Request::Append {
        search_term: search_term.to_string(),
        text: text.to_string(),
    })
}

#[test]
fn add_reports_file_and_categorised_heading() {
    let temp = TempDir::new().unwrap();
    let response = add(&context(temp.path()), "Fix cache bug", "Eviction never ran.");

    with_settings!({sort_maps => true}, {
        assert_json_snapshot!(response, {".path" => "[path]"}, @r#"
        {
          "category": "Work",
          "file": "2025/11-November.md",
          "heading": "Work - Fix cache bug",
          "path": "[path]",
          "status": "success",
          "success": true
        }
        "#);
    });
}

#[test]
fn search_returns_scored_results() {
    let temp = TempDir::new().unwrap();
    let context = context(temp.path());
    add(&context, "Fix cache bug", "Eviction never ran.");

    let response = context.dispatch(Request::Search {
        query: "cache bug".to_string(),
        max_results: None,
    });

    with_settings!({sort_maps => true}, {
        assert_json_snapshot!(response, @r#"
        {
          "count": 1,
          "query": "cache bug",
          "results": [
            {
              "category": "Work",
              "content": "Eviction never ran.",
              "date": "2025-11-20",
              "file": "2025/11-November.md",
              "heading": "Work - Fix cache bug",
              "score": 510
            }
          ],
          "status": "success",
          "success": true
        }
        "#);
    });
}

#[test]
fn weak_append_is_ambiguous_and_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let context = context(temp.path());
    add(&context, "Fix cache bug", "Eviction never ran.");
    let month_file = temp.path().join("2025").join("11-November.md");
    let before = fs::read_to_string(&month_file).unwrap();

    let response = append(&context, "meeting notes", "Agenda for Monday");

    with_settings!({sort_maps => true}, {
        assert_json_snapshot!(response, @r#"
        {
          "alternatives": [
            {
              "file": "2025/11-November.md",
              "heading": "Work - Fix cache bug",
              "score": 10
            }
          ],
          "message": "No entry matched with a score of at least 50; nothing was changed.",
          "query": "meeting notes",
          "status": "ambiguous",
          "success": false
        }
        "#);
    });
    assert_eq!(fs::read_to_string(&month_file).unwrap(), before);
}

#[test]
fn append_on_empty_store_is_not_found() {
    let temp = TempDir::new().unwrap();
    let response = append(&context(&temp.path().join("missing")), "anything", "text");

    assert_eq!(response.status, "not_found");
    assert!(!response.success);
    assert_eq!(response.get("query"), Some(&json!("anything")));
}

#[test]
fn confident_append_updates_the_match() {
    let temp = TempDir::new().unwrap();
    let context = context(temp.path());
    add(&context, "Fix cache bug", "Eviction never ran.");

    let response = append(&context, "cache bug", "Added a regression test");

    assert_eq!(response.status, "success");
    assert!(response.success);
    assert_eq!(response.get("heading"), Some(&json!("Work - Fix cache bug")));
    assert_eq!(response.get("alternatives"), Some(&json!([])));
    let text = fs::read_to_string(temp.path().join("2025").join("11-November.md")).unwrap();
    assert!(text.contains("**Update (2025-11-20):** Added a regression test"));
}

#[test]
fn blank_heading_is_a_validation_error() {
    let temp = TempDir::new().unwrap();
    let response = add(&context(temp.path()), "   ", "body");

    with_settings!({sort_maps => true}, {
        assert_json_snapshot!(response, @r#"
        {
          "error": "validation",
          "message": "missing required field: heading",
          "status": "error",
          "success": false
        }
        "#);
    });
}

#[test]
fn held_lock_is_reported_as_locked() {
    let temp = TempDir::new().unwrap();
    let context = context(temp.path());
    let _lock = RootLock::acquire(temp.path()).unwrap();

    let response = add(&context, "Fix cache bug", "Eviction never ran.");

    assert_eq!(response.status, "error");
    assert_eq!(response.get("error"), Some(&json!("locked")));
    let message = response.get("message").and_then(Value::as_str).unwrap();
    assert!(!message.contains(&temp.path().display().to_string()));
    assert!(!temp.path().join("2025").exists());
}

#[test]
fn migrate_requires_a_source_dir() {
    let temp = TempDir::new().unwrap();
    let response = context(temp.path()).dispatch(Request::Migrate { source_dir: None });

    assert_eq!(response.get("error"), Some(&json!("validation")));
    assert_eq!(
        response.get("message"),
        Some(&json!("missing required field: source_dir"))
    );
}

#[test]
fn migrate_with_bad_file_is_partial() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("legacy");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("2023-07.md"), "# Deploy the server\nsteps\n").unwrap();
    fs::write(source.join("broken.md"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

    let mut settings = Settings::default();
    settings.migrate.allowed_roots = vec![temp.path().to_path_buf()];
    let context = context_with(&temp.path().join("notes"), settings);

    let response = context.dispatch(Request::Migrate {
        source_dir: Some(source),
    });

    assert_eq!(response.status, "partial");
    assert!(response.success);
    assert_eq!(response.get("imported"), Some(&json!(1)));
    assert_eq!(response.get("errors"), Some(&json!(1)));
    assert_eq!(response.get("index_rebuilt"), Some(&json!(true)));
    let imported = fs::read_to_string(temp.path().join("notes/2023/07-July.md")).unwrap();
    assert!(imported.starts_with("# Notes - July 2023\n"));
    assert!(imported.contains("# Work - Deploy the server"));
}

#[test]
fn stats_and_reindex_agree() {
    let temp = TempDir::new().unwrap();
    let context = context(temp.path());
    add(&context, "Fix cache bug", "Eviction never ran.");
    add(&context, "Garden idea", "Raised beds.");

    let reindex = context.dispatch(Request::Reindex);
    let stats = context.dispatch(Request::Stats);

    assert_eq!(reindex.get("total_entries"), Some(&json!(2)));
    assert_eq!(reindex.get("total_files"), Some(&json!(1)));
    assert_eq!(stats.get("total_entries"), Some(&json!(2)));
    assert_eq!(
        stats.get("categories"),
        Some(&json!({"Idea": 1, "Work": 1}))
    );
}

#[test]
fn info_describes_the_resolved_root() {
    let temp = TempDir::new().unwrap();
    let response = context(temp.path()).dispatch(Request::Info);

    assert_eq!(response.status, "success");
    assert_eq!(response.get("root_source"), Some(&json!("explicit")));
    assert_eq!(response.get("notes_dir_exists"), Some(&json!(true)));
    assert_eq!(response.get("index_exists"), Some(&json!(false)));
    assert_eq!(response.get("onedrive_detected"), Some(&json!(false)));
    assert_eq!(
        response.get("platform"),
        Some(&json!(std::env::consts::OS))
    );
}

#[test]
fn clean_index_rebuilds() {
    let temp = TempDir::new().unwrap();
    let context = context(temp.path());
    add(&context, "Fix cache bug", "Eviction never ran.");

    let response = context.dispatch(Request::CleanIndex);

    assert_eq!(response.status, "success");
    assert_eq!(
        response.get("message"),
        Some(&json!("Index cleaned and rebuilt"))
    );
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".bak-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn run_honours_notes_dir_in_the_request() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("journal");
    let config_file = temp.path().join("config.toml");
    let input = json!({
        "command": "add",
        "heading": "Idea - Solar lamp",
        "content": "Charge it in the window.",
        "notes_dir": root,
    })
    .to_string();

    let response = run(&input, None, Some(&config_file));

    assert_eq!(response.status, "success", "{response:?}");
    let file = response.get("file").and_then(Value::as_str).unwrap();
    let text = fs::read_to_string(root.join(file)).unwrap();
    assert!(text.contains("# Idea - Solar lamp\nCharge it in the window."));
}

#[test]
fn run_rejects_unknown_commands() {
    let response = run(r#"{"command":"explode"}"#, None, None);

    assert_eq!(response.status, "error");
    assert_eq!(response.get("error"), Some(&json!("invalid_request")));
}

#[test]
fn run_without_input_prints_help() {
    let response = run("", None, None);

    assert_eq!(response.status, "help");
    assert!(response.success);
    assert!(response.get("usage").is_some());
}
