//! Common error types for KAMs Journey

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for KAMs Journey operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the loader and the read API
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input document is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Singular lookup matched zero rows
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Ingested record could not be turned into a row
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Ingestion input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),
}

impl Error {
    /// True for the distinguished absent-result condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
