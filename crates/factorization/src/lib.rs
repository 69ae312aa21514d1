//! # Factorization Crate
//!
//! Matrix-factorization core of the restaurant recommender.
//!
//! ## Components
//!
//! - **encoder**: dense indices for raw user and restaurant identifiers
//! - **model**: latent factor matrices and biases, `predict`
//! - **trainer**: SGD fitting of a model for one `TrainingConfig`
//! - **prediction**: raw-identifier queries that reject cold-start ids
//! - **snapshot**: versioned JSON export of a trained service
//! - **cancel**: cooperative cancellation of long training runs
//!
//! ## Example Usage
//!
//! ```ignore
//! use factorization::{EncoderTable, PredictionService, Trainer, TrainingConfig};
//!
//! let table = EncoderTable::build(dataset.records())?;
//! let model = Trainer::new(TrainingConfig::default()).fit(dataset.records(), &table)?;
//! let service = PredictionService::new(model, table);
//! let score = service.predict("U1134", "Restaurant Wu Zhuo Yi")?;
//! ```

pub mod cancel;
pub mod config;
pub mod encoder;
pub mod error;
pub mod model;
pub mod prediction;
pub mod snapshot;
pub mod trainer;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::TrainingConfig;
pub use encoder::{EncoderTable, IdentifierTable, Namespace, Observation};
pub use error::{FactorizationError, Result};
pub use model::FactorModel;
pub use prediction::PredictionService;
pub use snapshot::ModelSnapshot;
pub use trainer::{Trainer, fit};
