//! Error types for trial-log wrangling

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or reshaping trial logs
#[derive(Debug, Error)]
pub enum WrangleError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty trial log: no header row")]
    EmptyFile,

    #[error("Malformed row {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cannot coerce {value:?} in column '{column}' (line {line}) to {expected}")]
    TypeCoercion {
        column: String,
        line: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Column mismatch: {0}")]
    ColumnMismatch(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
