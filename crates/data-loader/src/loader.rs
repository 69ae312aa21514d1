//! Building a `RatingDataset` from a file on disk.

use crate::error::Result;
use crate::parser::{self, LoadOptions};
use crate::types::RatingDataset;
use std::path::Path;
use tracing::{info, instrument};

impl RatingDataset {
    /// Load and validate a ratings file.
    ///
    /// Steps:
    /// 1. Parse rows according to `options.layout`
    /// 2. Validate identifiers and ratings
    /// 3. Log the corpus size
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_file(path: &Path, options: &LoadOptions) -> Result<Self> {
        info!("Loading ratings from {:?}", path);

        let records = parser::parse_ratings(path, options)?;
        let dataset = RatingDataset::new(records);
        dataset.validate()?;

        let (users, items, ratings) = dataset.counts();
        info!(
            "Loaded {} ratings from {} users over {} restaurants",
            ratings, users, items
        );
        Ok(dataset)
    }
}
