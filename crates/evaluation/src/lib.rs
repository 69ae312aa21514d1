//! # Evaluation Crate
//!
//! Measures how well a `TrainingConfig` generalizes.
//!
//! ## Components
//!
//! - **folds**: seeded k-fold partition of record indices
//! - **metrics**: RMSE and R² per fold and averaged
//! - **cross_validation**: `CrossValidator`, one fresh model per fold
//! - **search**: grid search over rank and iterations, ranked by R²
//!
//! Fold training runs in parallel on rayon; every fold owns its model.
//!
//! ## Example Usage
//!
//! ```ignore
//! use evaluation::{CrossValidator, HyperparameterSearch, SearchGrid};
//!
//! let metrics = CrossValidator::default().cross_validate(dataset.records(), &config)?;
//! println!("rmse {:.4}, r² {:.4}", metrics.rmse, metrics.r_squared);
//!
//! let table = HyperparameterSearch::new(CrossValidator::default(), config)
//!     .search(dataset.records(), &SearchGrid::default())?;
//! ```

pub mod cross_validation;
pub mod error;
pub mod folds;
pub mod metrics;
pub mod search;

pub use cross_validation::{CrossValidator, DEFAULT_FOLDS};
pub use error::{EvaluationError, Result};
pub use metrics::{AggregatedMetrics, FoldMetrics, Metrics, regression_metrics};
pub use search::{HyperparameterSearch, ParamRange, SearchGrid, SearchResult};
