//! Error types for StreamLens

use thiserror::Error;

/// Result type alias using StreamLens Error
pub type Result<T> = std::result::Result<T, Error>;

/// StreamLens error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Not a JSON export: {0}")]
    NotAnExport(String),

    #[error("No play records found in the given input")]
    NoRecords,
}
