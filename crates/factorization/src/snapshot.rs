//! Versioned JSON container for a trained prediction service.
//!
//! A snapshot holds the training configuration, both identifier tables and
//! the factor model, which is everything needed to answer predictions
//! without retraining.

use crate::config::TrainingConfig;
use crate::encoder::EncoderTable;
use crate::error::{FactorizationError, Result};
use crate::model::FactorModel;
use crate::prediction::PredictionService;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// Current snapshot layout version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub format_version: u32,
    pub config: TrainingConfig,
    pub encoder: EncoderTable,
    pub model: FactorModel,
}

impl ModelSnapshot {
    pub fn new(config: TrainingConfig, service: PredictionService) -> Self {
        let (model, encoder) = service.into_parts();
        Self {
            format_version: FORMAT_VERSION,
            config,
            encoder,
            model,
        }
    }

    /// Check the version and that model shapes match the encoder
    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(FactorizationError::InvalidSnapshot(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        if !self.model.shape_is_consistent() {
            return Err(FactorizationError::InvalidSnapshot(
                "factor arrays do not match the declared dimensions".to_string(),
            ));
        }
        if self.model.num_users() != self.encoder.num_users() || self.model.num_items() != self.encoder.num_items() {
            return Err(FactorizationError::InvalidSnapshot(format!(
                "model is {}x{} but the encoder knows {} users and {} items",
                self.model.num_users(),
                self.model.num_items(),
                self.encoder.num_users(),
                self.encoder.num_items()
            )));
        }
        if self.model.rank() != self.config.rank {
            return Err(FactorizationError::InvalidSnapshot(format!(
                "model rank {} differs from configured rank {}",
                self.model.rank(),
                self.config.rank
            )));
        }
        Ok(())
    }

    pub fn into_service(self) -> Result<PredictionService> {
        self.validate()?;
        Ok(PredictionService::new(self.model, self.encoder))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let snapshot: ModelSnapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!("Saved model snapshot to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = Self::read_from(BufReader::new(File::open(path)?))?;
        info!(
            "Loaded rank-{} snapshot with {} users and {} items from {:?}",
            snapshot.model.rank(),
            snapshot.encoder.num_users(),
            snapshot.encoder.num_items(),
            path
        );
        Ok(snapshot)
    }
}
