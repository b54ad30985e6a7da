//! Error types for table rendering

use thiserror::Error;

/// Result type alias for table rendering
pub type TableResult<T> = std::result::Result<T, TableError>;

/// Reasons a text cannot be rendered as a table
#[derive(Debug, Error)]
pub enum TableError {
    /// Nothing to parse after normalization
    #[error("JSON text is empty")]
    Empty,

    /// Text is not valid JSON
    #[error("Invalid JSON: {0}")]
    Invalid(#[from] serde_json::Error),

    /// Top-level value is not an array
    #[error("Expected a JSON array of records")]
    NotArray,

    /// Array has no records
    #[error("JSON array has no records")]
    NoRecords,

    /// A record is not an object
    #[error("Record {0} is not a JSON object")]
    NotObject(usize),
}
