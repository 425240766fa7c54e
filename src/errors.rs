//! Crate-level errors: everything the CLI can surface to the user.

use std::path::PathBuf;
use thiserror::Error;

use crate::query::QueryError;
use crate::rules::RuleError;

#[derive(Error, Debug)]
pub enum DocError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("failed to read/write document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML document: {0}")]
    Malformed(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("invalid rule file {}: {}", path.display(), reason)]
    InvalidRuleFile { path: PathBuf, reason: String },

    #[error("rule {index}: {reason}")]
    InvalidRule { index: usize, reason: String },
}

pub type DocResult<T> = Result<T, DocError>;
