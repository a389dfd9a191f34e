use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end a run. Task commands never produce one of these:
/// their output, diagnostics included, is recorded as-is.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("configuration file \".gitstats.yml\" is missing in the repository ({})", path.display())]
    ConfigurationMissing { path: PathBuf },

    /// Unparseable YAML, or a document that is not shaped like a task table.
    #[error("invalid configuration {}: {message}", path.display())]
    ConfigurationMalformed { path: PathBuf, message: String },

    #[error("failed to clone {url}: {stderr}")]
    CloneFailed { url: String, stderr: String },

    #[error("failed to check out commit {commit}: {stderr}")]
    CheckoutFailed { commit: String, stderr: String },

    #[error("unknown output format '{name}' (expected one of: csv, json)")]
    UnknownFormat { name: String },

    #[error("invalid {format} option: {message}")]
    FormatOption {
        format: &'static str,
        message: String,
    },

    #[error("git log failed: {stderr}")]
    GitLog { stderr: String },

    #[error("commit {commit} has an unreadable timestamp '{value}'")]
    Timestamp { commit: String, value: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

impl StatsError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
