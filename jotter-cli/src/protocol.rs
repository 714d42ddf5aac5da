//! Wire format of the command processor.
//!
//! A request is one JSON object whose `command` field selects the variant.
//! Every response carries `status` and `success`; failures add `error` (a
//! stable kind) and `message`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Request {
    Add {
        #[serde(default)]
        heading: String,
        #[serde(default, alias = "content")]
        body: String,
        #[serde(default)]
        category: Option<String>,
    },
    Search {
        #[serde(default)]
        query: String,
        #[serde(default)]
        max_results: Option<usize>,
    },
    Append {
        #[serde(default)]
        search_term: String,
        #[serde(default, alias = "content")]
        text: String,
    },
    Reindex,
    Stats,
    Validate,
    Migrate {
        #[serde(default)]
        source_dir: Option<PathBuf>,
    },
    CleanIndex,
    Info,
    Help,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Search { .. } => "search",
            Self::Append { .. } => "append",
            Self::Reindex => "reindex",
            Self::Stats => "stats",
            Self::Validate => "validate",
            Self::Migrate { .. } => "migrate",
            Self::CleanIndex => "clean-index",
            Self::Info => "info",
            Self::Help => "help",
        }
    }
}

/// A request plus the per-request storage root override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub request: Request,
    pub notes_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("request is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("request must be a JSON object")]
    NotAnObject,

    #[error("invalid request: {0}")]
    Invalid(#[source] serde_json::Error),
}

impl Envelope {
    /// Decode raw stdin. Blank input means `help`.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        if input.trim().is_empty() {
            return Ok(Self {
                request: Request::Help,
                notes_dir: None,
            });
        }
        let value: Value = serde_json::from_str(input).map_err(ProtocolError::Json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut map) = value else {
            return Err(ProtocolError::NotAnObject);
        };
        let notes_dir = map
            .remove("notes_dir")
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        if !map.contains_key("command") {
            map.insert("command".to_string(), Value::from("help"));
        }
        let request =
            serde_json::from_value(Value::Object(map)).map_err(ProtocolError::Invalid)?;
        Ok(Self { request, notes_dir })
    }
}

/// One command response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: String,
    pub success: bool,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Response {
    /// Response whose fields come from `payload`, which must serialize to a
    /// JSON object. `status` and `success` keys in the payload are replaced.
    pub fn with_payload(status: &str, success: bool, payload: impl Serialize) -> Self {
        let body = match serde_json::to_value(payload) {
            Ok(Value::Object(mut map)) => {
                map.remove("status");
                map.remove("success");
                map
            }
            Ok(other) => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
            Err(err) => return Self::failure("io", &format!("failed to encode response: {err}")),
        };
        Self {
            status: status.to_string(),
            success,
            body,
        }
    }

    pub fn success(payload: impl Serialize) -> Self {
        Self::with_payload("success", true, payload)
    }

    pub fn failure(kind: &str, message: &str) -> Self {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::from(kind));
        body.insert("message".to_string(), Value::from(message));
        Self {
            status: "error".to_string(),
            success: false,
            body,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
