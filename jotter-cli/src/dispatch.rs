//! Routes decoded requests to the notes engine and shapes the responses.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::{Value, json};
use tracing::{debug, warn};

use jotter_core::{Config, ConfigError, HostDirs, KnowledgeSettings};
use jotter_knowledge::{
    AppendOutcome, CONFIDENCE_THRESHOLD, KnowledgeError, NoteAppendRequest, NoteCreateRequest,
    NotesEngine,
};

use crate::protocol::{Envelope, Request, Response};

const USAGE: &str = r#"echo '{"command":"search","query":"test"}' | jotter"#;

/// Everything a command needs: resolved configuration and host directories.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub host: HostDirs,
    pub config_file: Option<PathBuf>,
    today: Option<NaiveDate>,
}

impl Context {
    pub fn new(config: Config, host: HostDirs) -> Self {
        Self {
            config,
            host,
            config_file: None,
            today: None,
        }
    }

    /// Load settings and resolve the root from the real environment.
    pub fn load(explicit_root: Option<&Path>, config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Config::load(explicit_root, config_file)?;
        Ok(Self {
            config,
            host: HostDirs::detect(),
            config_file: Config::settings_path(config_file),
            today: None,
        })
    }

    /// Pin "today" for every engine this context builds.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn engine(&self) -> NotesEngine {
        let settings =
            KnowledgeSettings::resolve(&self.config.settings, &self.config.root, &self.host);
        let engine = NotesEngine::new(settings);
        match self.today {
            Some(today) => engine.with_today(today),
            None => engine,
        }
    }

    pub fn dispatch(&self, request: Request) -> Response {
        debug!(command = request.name(), root = %self.config.root_path().display(), "dispatching");
        let engine = self.engine();
        let result = match request {
            Request::Add {
                heading,
                body,
                category,
            } => engine
                .add(NoteCreateRequest {
                    heading,
                    body,
                    category,
                })
                .map(Response::success),
            Request::Search { query, max_results } => engine
                .search(&query, max_results)
                .map(|results| {
                    Response::success(json!({
                        "query": query,
                        "count": results.len(),
                        "results": results,
                    }))
                }),
            Request::Append { search_term, text } => engine
                .append(NoteAppendRequest { search_term, text })
                .map(append_response),
            Request::Reindex => engine.reindex().map(Response::success),
            Request::Stats => engine.stats().map(Response::success),
            Request::Validate => engine.validate().map(Response::success),
            Request::Migrate { source_dir } => match source_dir {
                Some(source) => engine.migrate(&source).map(|report| {
                    let status = serde_json::to_value(&report.status)
                        .ok()
                        .and_then(|value| value.as_str().map(str::to_string))
                        .unwrap_or_else(|| "success".to_string());
                    Response::with_payload(&status, true, report)
                }),
                None => Err(KnowledgeError::MissingField("source_dir")),
            },
            Request::CleanIndex => engine.clean_index().map(Response::success),
            Request::Info => Ok(self.info(&engine)),
            Request::Help => Ok(help()),
        };

        result.unwrap_or_else(|err| {
            warn!(error = %err, kind = err.kind(), "command failed");
            Response::failure(err.kind(), &sanitize(&err.to_string(), engine.root()))
        })
    }

    fn info(&self, engine: &NotesEngine) -> Response {
        let mut response = Response::success(engine.storage_info());
        let onedrive_detected = self
            .host
            .onedrive_documents()
            .is_some_and(|path| path.is_dir());
        let extra = json!({
            "root_source": self.config.root.source,
            "home_dir": self.host.home,
            "onedrive_detected": onedrive_detected,
            "platform": std::env::consts::OS,
            "config_file": self.config_file,
            "allowed_import_roots": engine.settings().allowed_import_roots,
            "version": env!("CARGO_PKG_VERSION"),
        });
        if let Value::Object(extra) = extra {
            response.body.extend(extra);
        }
        response
    }
}

/// Decode `input`, resolve configuration and run the command. Never fails:
/// every problem becomes an error response.
pub fn run(input: &str, cli_root: Option<&Path>, config_file: Option<&Path>) -> Response {
    let envelope = match Envelope::parse(input) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "rejecting request");
            return Response::failure("invalid_request", &err.to_string());
        }
    };
    if envelope.request == Request::Help {
        return help();
    }

    let explicit_root = envelope.notes_dir.as_deref().or(cli_root);
    match Context::load(explicit_root, config_file) {
        Ok(context) => context.dispatch(envelope.request),
        Err(err) => {
            warn!(error = %err, "configuration failed");
            Response::failure(config_error_kind(&err), &err.to_string())
        }
    }
}

fn config_error_kind(err: &ConfigError) -> &'static str {
    match err {
        ConfigError::Settings(jotter_core::SettingsError::Io(_)) => "io",
        ConfigError::Settings(_) | ConfigError::Path(_) => "validation",
    }
}

fn append_response(outcome: AppendOutcome) -> Response {
    match outcome {
        AppendOutcome::Appended(result) => Response::success(result),
        AppendOutcome::NotConfident {
            query,
            alternatives,
        } if alternatives.is_empty() => Response::with_payload(
            "not_found",
            false,
            json!({
                "query": query,
                "message": "No matching entry found. Create a new note?",
            }),
        ),
        AppendOutcome::NotConfident {
            query,
            alternatives,
        } => Response::with_payload(
            "ambiguous",
            false,
            json!({
                "query": query,
                "alternatives": alternatives,
                "message": format!(
                    "No entry matched with a score of at least {CONFIDENCE_THRESHOLD}; nothing was changed."
                ),
            }),
        ),
    }
}

fn help() -> Response {
    Response::with_payload(
        "help",
        true,
        json!({
            "commands": {
                "add": "Add a new note (heading, body or content, optional category)",
                "search": "Search notes (query, optional max_results)",
                "append": "Append a dated update to the best match (search_term, text or content)",
                "reindex": "Rebuild the search index",
                "stats": "Summarise entries, categories and keywords",
                "validate": "Check monthly files for structural problems",
                "migrate": "Import markdown from a legacy directory (source_dir)",
                "clean-index": "Back up, rebuild and verify the index",
                "info": "Show the notes directory, index and environment",
                "help": "Show this message",
            },
            "usage": USAGE,
        }),
    )
}

/// Drop the storage root prefix from messages so responses show paths
/// relative to it.
fn sanitize(message: &str, root: &Path) -> String {
    let root = root.display().to_string();
    if root.is_empty() {
        return message.to_string();
    }
    message
        .replace(&format!("{root}{}", std::path::MAIN_SEPARATOR), "")
        .replace(&root, "<notes>")
}
