//! Training configuration for the matrix-factorization trainer.

use crate::error::{FactorizationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters of one training run.
///
/// A plain value type: searches build one per grid cell and every fold of a
/// cell trains with a copy of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Dimensionality of the latent factor space
    pub rank: usize,
    /// Number of passes over the training records
    pub iterations: usize,
    pub learning_rate: f64,
    /// L2 penalty applied to factors and biases
    pub regularization: f64,
    /// Learn global, user and restaurant biases next to the factors
    pub use_bias: bool,
    /// Re-shuffle the visit order every epoch
    pub shuffle: bool,
    /// Seed for factor initialization and epoch shuffling
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            rank: 200,
            iterations: 10,
            learning_rate: 0.01,
            regularization: 0.05,
            use_bias: true,
            shuffle: true,
            seed: 0,
        }
    }
}

impl TrainingConfig {
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject parameters that cannot produce a model
    pub fn validate(&self) -> Result<()> {
        if self.rank < 1 {
            return Err(FactorizationError::InvalidConfiguration(format!(
                "rank must be at least 1, got {}",
                self.rank
            )));
        }
        if self.iterations < 1 {
            return Err(FactorizationError::InvalidConfiguration(format!(
                "iterations must be at least 1, got {}",
                self.iterations
            )));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(FactorizationError::InvalidConfiguration(format!(
                "learning rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(FactorizationError::InvalidConfiguration(format!(
                "regularization must be a non-negative finite number, got {}",
                self.regularization
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TrainingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rank={} iterations={} lr={} reg={}",
            self.rank, self.iterations, self.learning_rate, self.regularization
        )
    }
}
