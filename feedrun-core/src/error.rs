//! Validation errors
//!
//! A [`ValidationError`] belongs to one job directory. It is attached to
//! the catalog entry instead of aborting discovery.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Config file exists but could not be read
    #[error("cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Missing required field, wrong type or malformed JSON
    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("unsupported source type '{0}' (expected 'script')")]
    UnsupportedSourceType(String),

    #[error("timeout_seconds must be greater than 0")]
    InvalidTimeout,

    #[error("working directory {0} does not exist")]
    MissingWorkingDirectory(PathBuf),

    #[error("entry point {0} does not exist")]
    MissingEntryPoint(PathBuf),

    /// Another job directory declares the same id
    #[error("job id '{id}' is also declared in {other}")]
    DuplicateId { id: String, other: PathBuf },
}
