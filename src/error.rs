//! Error types for rss-comb
//!
//! Mirrors the library's error taxonomy onto the operational categories the
//! scheduler needs to reason about: transient I/O and upstream-format errors
//! are retryable, validation/config/integrity errors are not.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias used throughout rss-comb.
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for rss-comb.
#[derive(Debug, Error)]
pub enum Error {
    /// Per-feed YAML configuration failed validation (pins file + field).
    #[error("configuration error in {file}: {message}")]
    Config {
        /// Path of the offending config file.
        file: String,
        /// Human-readable description of the problem.
        message: String,
    },

    /// Repository operation failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Raw sqlx error, wrapped for operations that don't have a more specific variant.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Fetching a feed or article over HTTP failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream feed could not be parsed as RSS or Atom.
    #[error("feed parse error: {0}")]
    Parse(String),

    /// The upstream response was not usable (empty body, non-2xx, wrong content type).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Filesystem watcher error (config hot-reload).
    #[error("config watch error: {0}")]
    ConfigWatch(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scheduler/task was cancelled; never retried, never counted as a failure.
    #[error("cancelled")]
    Cancelled,

    /// Something was looked up by ID/path and did not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Catch-all for conditions with no dedicated variant.
    #[error("{0}")]
    Other(String),
}

/// Repository-layer errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a pool connection.
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Migration bootstrap failed.
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// A query executed but failed at the database.
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// API error response envelope (matches the documented admin-endpoint error shape).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Build an API error from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Maps an internal error to the HTTP status code the admin surface should return.
pub trait ToHttpStatus {
    /// The status code this error should be reported as.
    fn status_code(&self) -> u16;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::NotFound(_) => 404,
            Error::Cancelled => 499,
            Error::Database(_) | Error::Sqlx(_) => 500,
            Error::Network(_) | Error::Upstream(_) | Error::Parse(_) => 502,
            Error::ConfigWatch(_) | Error::Io(_) | Error::Other(_) => 500,
        }
    }
}
