//! Error types for the document index engine.
//!
//! Store, configuration and admin operations return [`DocIndexError`]. The two
//! indexing entry points never surface these to the caller; they flatten them
//! into warning strings instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docindex.
#[derive(Debug, Error)]
pub enum DocIndexError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Tree errors
    #[error("Index definition not found: {id}")]
    DefinitionNotFound { id: i64 },

    #[error("Index instance not found: {id}")]
    InstanceNotFound { id: i64 },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for docindex operations.
pub type Result<T> = std::result::Result<T, DocIndexError>;

impl From<std::io::Error> for DocIndexError {
    fn from(err: std::io::Error) -> Self {
        DocIndexError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for DocIndexError {
    fn from(err: serde_json::Error) -> Self {
        DocIndexError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for DocIndexError {
    fn from(err: rusqlite::Error) -> Self {
        DocIndexError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl DocIndexError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        DocIndexError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the error refers to a tree node that vanished underneath us.
    pub fn is_stale_reference(&self) -> bool {
        matches!(
            self,
            DocIndexError::InstanceNotFound { .. } | DocIndexError::DefinitionNotFound { .. }
        )
    }
}
