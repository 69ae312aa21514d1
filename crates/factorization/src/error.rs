//! Error types for encoding, training and prediction.

use crate::encoder::Namespace;
use thiserror::Error;

/// Errors surfaced by the factorization core.
///
/// Validation failures (`InvalidRecord`, `InvalidConfiguration`) are raised
/// before any factor matrix is allocated.
#[derive(Error, Debug)]
pub enum FactorizationError {
    /// A record with an empty identifier or a non-finite rating
    #[error("Invalid record at position {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// Lookup of an identifier that was never seen at encoding time
    #[error("Unknown {namespace} identifier '{id}'")]
    UnknownIdentifier { namespace: Namespace, id: String },

    /// Rejected training parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A dense index outside the model's dimensions
    #[error("{namespace} index {index} out of range (model has {len})")]
    IndexOutOfRange {
        namespace: Namespace,
        index: usize,
        len: usize,
    },

    /// Factors overflowed to NaN/infinity, usually from a too-large learning rate
    #[error("Training diverged: non-finite factors after epoch {epoch}")]
    DivergedTraining { epoch: usize },

    /// A cancellation token fired while training
    #[error("Training cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot whose version or shapes do not line up
    #[error("Invalid model snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, FactorizationError>;
