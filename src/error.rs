//! Error types for tree operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by tree, directory and file operations
#[derive(Debug, Error)]
pub enum TreeError {
    /// Empty or malformed child name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value cannot be attached as a child
    #[error("Invalid child: {0}")]
    InvalidChild(String),

    /// No overlay entry and no filesystem entry for the name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem path is occupied by an entry of the other kind
    #[error("Conflict at {path}: {reason}")]
    Conflict { path: PathBuf, reason: String },

    /// Operation not valid for the file's mode
    #[error("Mode error: {0}")]
    Mode(String),

    /// Tree or configuration is not usable as given
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Handle refers to a node that was removed from its tree
    #[error("Node is detached from its tree")]
    Detached,

    /// Directory operation on a file handle or vice versa
    #[error("Wrong node kind: expected {expected}")]
    WrongKind { expected: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be rendered as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for TreeError {
    fn from(err: config::ConfigError) -> Self {
        TreeError::ConfigError(err.to_string())
    }
}

/// Failure raised by a node factory
///
/// Factories report this when they cannot build a node for the given
/// context. Lazy resolution recovers from it by falling back to a plain file.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("factory rejected {name}: {reason}")]
    Rejected { name: String, reason: String },

    #[error("factory for {name} produced a directory for a regular file")]
    UnexpectedDirectory { name: String },

    #[error("factory I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl FactoryError {
    pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FactoryError::Rejected {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;
