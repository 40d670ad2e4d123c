//! Error types for gymlog-core

use thiserror::Error;

/// Main error type for the gymlog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Background worker panicked or was cancelled before producing a result
    #[error("background worker failed: {0}")]
    Worker(String),

    /// The producer behind an observable query has stopped
    #[error("observable query closed")]
    Closed,

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Worker(err.to_string())
    }
}

/// Result type alias for gymlog-core
pub type Result<T> = std::result::Result<T, Error>;
