//! Stochastic gradient descent over latent factors.
//!
//! ## Algorithm
//! For `iterations` epochs, visit every observation (u, i, r):
//! 1. error = r - predict(u, i)
//! 2. move both factor rows along the error gradient, shrunk by the L2 penalty
//! 3. move the user, restaurant and global biases the same way
//!
//! Cost per epoch is linear in observations x rank. Updates are sequential:
//! every step reads and writes shared factor rows, so one fit never runs in
//! parallel. Users or restaurants with no observations keep their initial
//! near-zero vectors and predict close to the global bias.

use crate::cancel::CancellationToken;
use crate::config::TrainingConfig;
use crate::encoder::{EncoderTable, Observation};
use crate::error::{FactorizationError, Result};
use crate::model::FactorModel;
use data_loader::RatingRecord;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

/// Fits `FactorModel`s for one configuration
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    cancellation: Option<CancellationToken>,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Stop training at the next epoch boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit a model on raw records, resolving ids through `table`.
    ///
    /// The configuration and every record are validated before any factor
    /// matrix is allocated.
    pub fn fit(&self, records: &[RatingRecord], table: &EncoderTable) -> Result<FactorModel> {
        self.config.validate()?;
        let observations = table.encode_all(records)?;
        self.fit_observations(&observations, table.num_users(), table.num_items())
    }

    /// Fit a model on already-encoded observations.
    ///
    /// An empty observation list is accepted and yields the initialized model.
    #[instrument(skip_all, fields(config = %self.config, observations = observations.len()))]
    pub fn fit_observations(&self, observations: &[Observation], num_users: usize, num_items: usize) -> Result<FactorModel> {
        self.config.validate()?;
        if let Some(bad) = observations
            .iter()
            .position(|o| o.user >= num_users || o.item >= num_items || !o.rating.is_finite())
        {
            return Err(FactorizationError::InvalidRecord {
                index: bad,
                reason: format!(
                    "observation outside a {}x{} model or with a non-finite rating",
                    num_users, num_items
                ),
            });
        }

        let config = &self.config;
        let mut model = FactorModel::initialize(num_users, num_items, config.rank, config.use_bias, config.seed);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..observations.len()).collect();

        for epoch in 1..=config.iterations {
            if config.shuffle {
                order.shuffle(&mut rng);
            }

            let mut squared_error = 0.0;
            for &idx in &order {
                let obs = observations[idx];
                let error = model.sgd_step(obs.user, obs.item, obs.rating, config.learning_rate, config.regularization);
                squared_error += error * error;
            }

            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                debug!("Training cancelled after epoch {}", epoch);
                return Err(FactorizationError::Cancelled);
            }

            if !model.is_finite() {
                return Err(FactorizationError::DivergedTraining { epoch });
            }

            if !observations.is_empty() {
                debug!(
                    "Epoch {} training rmse {:.4}",
                    epoch,
                    (squared_error / observations.len() as f64).sqrt()
                );
            }
        }

        debug!("Trained {}x{} model", num_users, num_items);
        Ok(model)
    }
}

/// Fit a model with a fresh trainer for `config`
pub fn fit(records: &[RatingRecord], table: &EncoderTable, config: &TrainingConfig) -> Result<FactorModel> {
    Trainer::new(*config).fit(records, table)
}
