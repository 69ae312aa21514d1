//! # Data Loader Crate
//!
//! Loads (user, restaurant, rating) observations from delimited files into an
//! in-memory `RatingDataset`.
//!
//! ## Main Components
//!
//! - **types**: `RatingRecord` and `RatingDataset`
//! - **parser**: header-aware parsing of TSV/CSV rating files
//! - **loader**: `RatingDataset::load_from_file`
//! - **error**: error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{LoadOptions, RatingDataset};
//! use std::path::Path;
//!
//! let dataset = RatingDataset::load_from_file(
//!     Path::new("data/trainingData.tsv"),
//!     &LoadOptions::default(),
//! )?;
//! let (users, restaurants, ratings) = dataset.counts();
//! println!("{} users rated {} restaurants", users, restaurants);
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod loader;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use parser::{ColumnLayout, LoadOptions};
pub use types::{ItemId, RatingDataset, RatingRecord, UserId};
