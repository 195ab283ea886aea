//! Error types for the data source, rule editing and workspace files.

use std::time::Duration;

use thiserror::Error;

/// Why the archive could not produce an hourly series.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed weather response: {0}")]
    Malformed(String),

    #[error("weather source is offline")]
    Offline,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RuleError {
    #[error("no rule at index {index} (rule set has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("workspace file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid workspace JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no zone with id {0}")]
    UnknownZone(String),
}
