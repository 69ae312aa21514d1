//! K-fold cross-validation of a training configuration.
//!
//! ## Algorithm
//! 1. Build the encoder once from ALL records, so every fold shares one
//!    index space and validation measures only the factorization, not
//!    cold-start encoding
//! 2. Partition records into `k` seeded folds
//! 3. For each fold, train a fresh model on the other folds and score the
//!    held-out one
//! 4. Average RMSE and R² over the folds
//!
//! Folds run on the rayon pool. Each fold owns its model and only reads the
//! shared observations.

use crate::error::{EvaluationError, Result};
use crate::folds::{assignments, partition};
use crate::metrics::{AggregatedMetrics, FoldMetrics, Metrics, regression_metrics};
use data_loader::RatingRecord;
use factorization::{CancellationToken, EncoderTable, FactorizationError, Observation, Trainer, TrainingConfig};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_FOLDS: usize = 5;

/// Records encoded and split once, shared by every fold run
#[derive(Debug)]
pub(crate) struct PreparedFolds {
    observations: Vec<Observation>,
    folds: Vec<Vec<usize>>,
    fold_of: Vec<usize>,
    num_users: usize,
    num_items: usize,
}

impl PreparedFolds {
    pub(crate) fn len(&self) -> usize {
        self.folds.len()
    }
}

/// Runs k-fold cross-validation
#[derive(Debug, Clone)]
pub struct CrossValidator {
    folds: usize,
    seed: u64,
    cancellation: Option<CancellationToken>,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(DEFAULT_FOLDS)
    }
}

impl CrossValidator {
    pub fn new(folds: usize) -> Self {
        Self {
            folds,
            seed: 0,
            cancellation: None,
        }
    }

    /// Seed for the fold shuffle (default: 0)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Reject a fold count below 2 and invalid training parameters
    pub(crate) fn validate(&self, config: &TrainingConfig) -> Result<()> {
        if self.folds < 2 {
            return Err(EvaluationError::InvalidConfiguration(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }
        config.validate()?;
        Ok(())
    }

    /// Encode all records with one global encoder and split them into folds
    pub(crate) fn prepare(&self, records: &[RatingRecord]) -> Result<PreparedFolds> {
        let table = EncoderTable::build(records)?;
        let observations = table.encode_all(records)?;
        let folds = partition(observations.len(), self.folds, self.seed)?;
        let fold_of = assignments(&folds, observations.len());

        debug!(
            "Prepared {} folds over {} records ({} users, {} items)",
            folds.len(),
            observations.len(),
            table.num_users(),
            table.num_items()
        );

        Ok(PreparedFolds {
            observations,
            folds,
            fold_of,
            num_users: table.num_users(),
            num_items: table.num_items(),
        })
    }

    /// Train on every fold but `fold` and score `fold`
    pub(crate) fn run_fold(&self, prepared: &PreparedFolds, fold: usize, config: &TrainingConfig) -> Result<FoldMetrics> {
        let held_out = &prepared.folds[fold];
        let training: Vec<Observation> = prepared
            .observations
            .iter()
            .zip(&prepared.fold_of)
            .filter(|&(_, &f)| f != fold)
            .map(|(obs, _)| *obs)
            .collect();

        let empty_fold = FoldMetrics {
            fold,
            held_out: 0,
            trained_on: training.len(),
            metrics: Metrics { rmse: 0.0, r_squared: 0.0 },
            degenerate: true,
        };
        if held_out.is_empty() {
            warn!("Fold {} holds out no records and is skipped", fold);
            return Ok(empty_fold);
        }

        let mut trainer = Trainer::new(*config);
        if let Some(token) = &self.cancellation {
            trainer = trainer.with_cancellation(token.clone());
        }
        let model = trainer
            .fit_observations(&training, prepared.num_users, prepared.num_items)
            .map_err(|source| match source {
                FactorizationError::Cancelled => EvaluationError::Cancelled,
                source => EvaluationError::Fold {
                    fold,
                    config: *config,
                    source,
                },
            })?;

        let pairs = held_out
            .iter()
            .map(|&idx| {
                let obs = prepared.observations[idx];
                model
                    .predict(obs.user, obs.item)
                    .map(|predicted| (obs.rating, predicted))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|source| EvaluationError::Fold {
                fold,
                config: *config,
                source,
            })?;

        let Some((metrics, constant)) = regression_metrics(&pairs) else {
            return Ok(empty_fold);
        };
        if constant {
            warn!("Fold {} has constant ratings; R² reported as 0", fold);
        }
        debug!(
            "Fold {}: rmse {:.4}, r² {:.4} ({} held out, {} trained)",
            fold,
            metrics.rmse,
            metrics.r_squared,
            held_out.len(),
            training.len()
        );

        Ok(FoldMetrics {
            fold,
            held_out: held_out.len(),
            trained_on: training.len(),
            metrics,
            degenerate: constant,
        })
    }

    /// Cross-validate `config` over `records`.
    ///
    /// The fold count and configuration are validated before anything is
    /// encoded or trained. The reported RMSE and R² are means over the folds
    /// that held out at least one record; empty folds (k > n) are listed in
    /// `folds` but do not count toward the means.
    #[instrument(skip_all, fields(folds = self.folds, config = %config))]
    pub fn cross_validate(&self, records: &[RatingRecord], config: &TrainingConfig) -> Result<AggregatedMetrics> {
        self.validate(config)?;
        let prepared = self.prepare(records)?;

        let fold_metrics = (0..prepared.len())
            .into_par_iter()
            .map(|fold| {
                if self.is_cancelled() {
                    return Err(EvaluationError::Cancelled);
                }
                self.run_fold(&prepared, fold, config)
            })
            .collect::<Result<Vec<_>>>()?;

        let aggregated = aggregate(fold_metrics)?;
        info!(
            "Cross-validated {}: rmse {:.4}, r² {:.4}",
            config, aggregated.rmse, aggregated.r_squared
        );
        Ok(aggregated)
    }
}

pub(crate) fn aggregate(fold_metrics: Vec<FoldMetrics>) -> Result<AggregatedMetrics> {
    AggregatedMetrics::from_folds(fold_metrics).ok_or_else(|| {
        EvaluationError::InvalidConfiguration("no fold has any held-out records".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<RatingRecord> {
        (0..n)
            .map(|i| RatingRecord::new(format!("U{}", i % 10), format!("R{}", i % 7), ((i * 3) % 5) as f64 + 1.0))
            .collect()
    }

    fn config() -> TrainingConfig {
        TrainingConfig::default().with_rank(4).with_iterations(10)
    }

    #[test]
    fn test_rejects_single_fold() {
        let err = CrossValidator::new(1).cross_validate(&records(10), &config()).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = CrossValidator::default()
            .cross_validate(&records(10), &config().with_rank(0))
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Factorization(FactorizationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_folds_partition_records() {
        let validator = CrossValidator::new(5);
        let prepared = validator.prepare(&records(100)).unwrap();
        assert_eq!(prepared.len(), 5);

        for fold in 0..5 {
            let metrics = validator.run_fold(&prepared, fold, &config()).unwrap();
            assert_eq!(metrics.held_out, 20);
            assert_eq!(metrics.trained_on, 80);
        }
    }

    #[test]
    fn test_metrics_are_sane() {
        let result = CrossValidator::default().cross_validate(&records(100), &config()).unwrap();
        assert_eq!(result.folds.len(), 5);
        assert!(result.rmse >= 0.0);
        assert!(result.r_squared <= 1.0);
        for fold in &result.folds {
            assert!(fold.metrics.rmse >= 0.0);
        }
    }

    #[test]
    fn test_reproducible() {
        let validator = CrossValidator::new(4).with_seed(5);
        let a = validator.cross_validate(&records(60), &config()).unwrap();
        let b = validator.cross_validate(&records(60), &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_fold_reports_zero_r_squared() {
        let constant: Vec<RatingRecord> = (0..20)
            .map(|i| RatingRecord::new(format!("U{}", i % 4), format!("R{}", i % 5), 3.0))
            .collect();
        let result = CrossValidator::new(2).cross_validate(&constant, &config()).unwrap();
        assert!(result.folds.iter().all(|f| f.degenerate && f.metrics.r_squared == 0.0));
        assert_eq!(result.r_squared, 0.0);
    }

    #[test]
    fn test_constant_inexact_ratings_report_zero_r_squared() {
        let constant: Vec<RatingRecord> = (0..40)
            .map(|i| RatingRecord::new(format!("U{}", i % 8), format!("R{}", i % 5), 0.1))
            .collect();
        let result = CrossValidator::new(4).cross_validate(&constant, &config()).unwrap();
        assert_eq!(result.folds.len(), 4);
        for fold in &result.folds {
            assert!(fold.degenerate, "fold {} should be flagged", fold.fold);
            assert_eq!(fold.metrics.r_squared, 0.0);
        }
        assert_eq!(result.r_squared, 0.0);
    }

    #[test]
    fn test_more_folds_than_records() {
        let result = CrossValidator::new(5).cross_validate(&records(3), &config()).unwrap();
        assert_eq!(result.folds.len(), 5);
        assert_eq!(result.folds.iter().filter(|f| f.held_out == 0).count(), 2);

        let scored: Vec<&FoldMetrics> = result.folds.iter().filter(|f| f.held_out > 0).collect();
        let mean_rmse = scored.iter().map(|f| f.metrics.rmse).sum::<f64>() / scored.len() as f64;
        assert!((result.rmse - mean_rmse).abs() < 1e-12);
    }

    #[test]
    fn test_no_records() {
        let err = CrossValidator::default().cross_validate(&[], &config()).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let err = CrossValidator::default()
            .with_cancellation(token)
            .cross_validate(&records(50), &config())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Cancelled));
    }

    #[test]
    fn test_divergence_names_fold() {
        let err = CrossValidator::new(2)
            .cross_validate(&records(40), &config().with_learning_rate(1.0e6).with_iterations(30))
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Fold { source: FactorizationError::DivergedTraining { .. }, .. }
        ));
    }
}
