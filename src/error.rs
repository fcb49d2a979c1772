//! Error types for each stage of a run.
//!
//! Only [`JobError::Authentication`] ends a run before anything is written.
//! Everything else degrades: extraction errors blank a field, source errors
//! during collection stop the loop early, and an unparseable store is read
//! as empty.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reading one field of one candidate post.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ExtractionError {
    #[error("field `{0}` not present")]
    Missing(&'static str),

    #[error("field `{field}` unreadable: {reason}")]
    Unreadable { field: &'static str, reason: String },
}

/// Failure talking to the tweet source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("timed out during {stage}")]
    Timeout { stage: &'static str },

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected response (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not parse feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout { stage: "request" }
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

impl From<rss::Error> for SourceError {
    fn from(err: rss::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Failure loading or saving a store file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unparseable store {}: {message}", path.display())]
    Format { path: PathBuf, message: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        StoreError::Format {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Run-fatal failures.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("could not establish a session with {source_name}: {cause}")]
    Authentication {
        source_name: String,
        #[source]
        cause: SourceError,
    },
}
