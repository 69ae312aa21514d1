//! Error types for the data-loader crate.
//!
//! Parse failures name the file and the 1-based line of the offending row.

use thiserror::Error;

/// Errors raised while reading or validating a ratings file
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Ratings file not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A row could not be turned into a rating
    #[error("{file}:{line}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// The header row does not name a column the layout requires
    #[error("{file}: header has no '{column}' column")]
    MissingColumn { file: String, column: String },

    #[error("{file}:{line}: row has {found} fields, header has {expected}")]
    FieldCountMismatch {
        file: String,
        expected: usize,
        found: usize,
        line: usize,
    },

    /// A record built in memory failed validation
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, DataLoadError>;
