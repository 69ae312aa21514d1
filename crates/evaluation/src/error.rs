//! Error types for cross-validation and hyperparameter search.

use factorization::{FactorizationError, TrainingConfig};
use thiserror::Error;

/// Errors from evaluation runs.
///
/// Folds with constant ratings or no records are not errors; they are
/// reported through `FoldMetrics::degenerate`.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Bad fold count, grid range or training parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Training failed inside one fold
    #[error("Fold {fold} failed for {config}: {source}")]
    Fold {
        fold: usize,
        config: TrainingConfig,
        #[source]
        source: FactorizationError,
    },

    /// Encoding or validation failed before any fold started
    #[error(transparent)]
    Factorization(#[from] FactorizationError),

    #[error("Evaluation cancelled")]
    Cancelled,
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, EvaluationError>;
