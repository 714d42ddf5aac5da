use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("path outside allowed root: {0}")]
    PathOutsideRoot(PathBuf),
    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("another write is in progress (lock held at {0})")]
    Locked(PathBuf),
    #[error("unknown entry: {0}")]
    UnknownEntry(String),
    #[error("index backup failed: {0}")]
    Backup(String),
}

impl KnowledgeError {
    /// Stable machine-readable kind used in command responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) | Self::InvalidField { .. } => "validation",
            Self::PathOutsideRoot(_) | Self::SourceNotFound(_) => "validation",
            Self::UnknownEntry(_) => "not_found",
            Self::Locked(_) => "locked",
            Self::Io(_) | Self::Json(_) | Self::Backup(_) => "io",
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
