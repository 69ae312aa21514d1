//! Grid search over rank and iteration count.
//!
//! Every (configuration, fold) pair is one unit of work on the rayon pool.
//! Units share only read-only observations; each trains its own model. The
//! ranked table is assembled after all units complete.

use crate::cross_validation::{CrossValidator, aggregate};
use crate::error::{EvaluationError, Result};
use crate::metrics::{AggregatedMetrics, FoldMetrics};
use data_loader::RatingRecord;
use factorization::{CancellationToken, TrainingConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, instrument};

/// Inclusive stepped range, e.g. 5..=95 step 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl ParamRange {
    pub fn new(start: usize, end: usize, step: usize) -> Result<Self> {
        let range = Self { start, end, step };
        range.validate()?;
        Ok(range)
    }

    /// A range holding exactly one value
    pub fn single(value: usize) -> Self {
        Self {
            start: value,
            end: value,
            step: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(EvaluationError::InvalidConfiguration(
                "range step must be at least 1".to_string(),
            ));
        }
        if self.start > self.end {
            return Err(EvaluationError::InvalidConfiguration(format!(
                "range start {} exceeds end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn values(&self) -> Vec<usize> {
        if self.step == 0 || self.start > self.end {
            return Vec::new();
        }
        (self.start..=self.end).step_by(self.step).collect()
    }
}

/// The rank x iterations grid to explore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchGrid {
    pub ranks: ParamRange,
    pub iterations: ParamRange,
}

impl Default for SearchGrid {
    fn default() -> Self {
        Self {
            ranks: ParamRange { start: 50, end: 200, step: 50 },
            iterations: ParamRange { start: 5, end: 95, step: 5 },
        }
    }
}

impl SearchGrid {
    /// Number of configurations in the grid
    pub fn len(&self) -> usize {
        self.ranks.values().len() * self.iterations.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One config per grid cell, derived from `base`; iterations vary slowest
    pub fn configs(&self, base: &TrainingConfig) -> Vec<TrainingConfig> {
        let ranks = self.ranks.values();
        self.iterations
            .values()
            .into_iter()
            .flat_map(|iterations| {
                ranks
                    .iter()
                    .map(move |&rank| base.with_iterations(iterations).with_rank(rank))
            })
            .collect()
    }
}

/// One ranked grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub config: TrainingConfig,
    pub metrics: AggregatedMetrics,
}

/// Best first: higher R², then lower RMSE, then fewer iterations
fn rank_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.metrics
        .r_squared
        .total_cmp(&a.metrics.r_squared)
        .then_with(|| a.metrics.rmse.total_cmp(&b.metrics.rmse))
        .then_with(|| a.config.iterations.cmp(&b.config.iterations))
}

/// Cross-validates every grid cell and ranks the results
#[derive(Debug, Clone)]
pub struct HyperparameterSearch {
    validator: CrossValidator,
    base: TrainingConfig,
}

impl HyperparameterSearch {
    /// `base` supplies learning rate, regularization, bias and seed for
    /// every cell; the grid overrides rank and iterations.
    pub fn new(validator: CrossValidator, base: TrainingConfig) -> Self {
        Self { validator, base }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.validator = self.validator.with_cancellation(token);
        self
    }

    #[instrument(skip_all, fields(cells = grid.len(), folds = self.validator.folds()))]
    pub fn search(&self, records: &[RatingRecord], grid: &SearchGrid) -> Result<Vec<SearchResult>> {
        grid.ranks.validate()?;
        grid.iterations.validate()?;
        let configs = grid.configs(&self.base);
        for config in &configs {
            self.validator.validate(config)?;
        }

        let prepared = self.validator.prepare(records)?;
        let units: Vec<(usize, usize)> = (0..configs.len())
            .flat_map(|cell| (0..prepared.len()).map(move |fold| (cell, fold)))
            .collect();
        info!(
            "Searching {} configurations x {} folds = {} training runs",
            configs.len(),
            prepared.len(),
            units.len()
        );

        let outcomes: Vec<(usize, FoldMetrics)> = units
            .into_par_iter()
            .map(|(cell, fold)| {
                if self.validator.is_cancelled() {
                    return Err(EvaluationError::Cancelled);
                }
                let metrics = self.validator.run_fold(&prepared, fold, &configs[cell])?;
                Ok((cell, metrics))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut per_cell: Vec<Vec<FoldMetrics>> = vec![Vec::new(); configs.len()];
        for (cell, metrics) in outcomes {
            per_cell[cell].push(metrics);
        }

        let mut results = configs
            .into_iter()
            .zip(per_cell)
            .map(|(config, mut folds)| {
                folds.sort_by_key(|f| f.fold);
                let metrics = aggregate(folds)?;
                debug!(
                    "rank={} iterations={}: rmse {:.4}, r² {:.4}",
                    config.rank, config.iterations, metrics.rmse, metrics.r_squared
                );
                Ok(SearchResult { config, metrics })
            })
            .collect::<Result<Vec<_>>>()?;

        results.sort_by(rank_results);
        if let Some(best) = results.first() {
            info!(
                "Best configuration: rank={} iterations={} (rmse {:.4}, r² {:.4})",
                best.config.rank, best.config.iterations, best.metrics.rmse, best.metrics.r_squared
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<RatingRecord> {
        (0..80)
            .map(|i| RatingRecord::new(format!("U{}", i % 8), format!("R{}", i % 6), ((i * 7) % 5) as f64))
            .collect()
    }

    fn base() -> TrainingConfig {
        TrainingConfig::default().with_learning_rate(0.02)
    }

    #[test]
    fn test_range_values() {
        assert_eq!(ParamRange::new(5, 20, 5).unwrap().values(), vec![5, 10, 15, 20]);
        assert_eq!(ParamRange::new(50, 200, 50).unwrap().values(), vec![50, 100, 150, 200]);
        assert_eq!(ParamRange::new(1, 4, 2).unwrap().values(), vec![1, 3]);
        assert_eq!(ParamRange::single(7).values(), vec![7]);
        assert!(ParamRange::new(5, 1, 1).is_err());
        assert!(ParamRange::new(1, 5, 0).is_err());
    }

    #[test]
    fn test_default_grid_matches_exploration() {
        let grid = SearchGrid::default();
        assert_eq!(grid.iterations.values().len(), 19);
        assert_eq!(grid.ranks.values().len(), 4);
        assert_eq!(grid.len(), 76);
    }

    #[test]
    fn test_configs_keep_base_parameters() {
        let grid = SearchGrid {
            ranks: ParamRange::new(2, 4, 2).unwrap(),
            iterations: ParamRange::new(1, 2, 1).unwrap(),
        };
        let configs = grid.configs(&base().with_seed(9));
        let cells: Vec<(usize, usize)> = configs.iter().map(|c| (c.iterations, c.rank)).collect();
        assert_eq!(cells, vec![(1, 2), (1, 4), (2, 2), (2, 4)]);
        assert!(configs.iter().all(|c| c.seed == 9 && c.learning_rate == 0.02));
    }

    #[test]
    fn test_search_returns_every_cell_ranked() {
        let grid = SearchGrid {
            ranks: ParamRange::new(2, 6, 2).unwrap(),
            iterations: ParamRange::new(5, 15, 5).unwrap(),
        };
        let search = HyperparameterSearch::new(CrossValidator::new(3), base());
        let results = search.search(&records(), &grid).unwrap();

        assert_eq!(results.len(), grid.len());
        for pair in results.windows(2) {
            assert!(pair[0].metrics.r_squared >= pair[1].metrics.r_squared);
        }
        for result in &results {
            assert_eq!(result.metrics.folds.len(), 3);
        }
    }

    #[test]
    fn test_search_matches_cross_validate() {
        let grid = SearchGrid {
            ranks: ParamRange::single(3),
            iterations: ParamRange::single(8),
        };
        let validator = CrossValidator::new(4).with_seed(2);
        let results = HyperparameterSearch::new(validator.clone(), base())
            .search(&records(), &grid)
            .unwrap();
        let direct = validator
            .cross_validate(&records(), &base().with_rank(3).with_iterations(8))
            .unwrap();
        assert_eq!(results[0].metrics, direct);
    }

    #[test]
    fn test_invalid_cell_rejected_before_training() {
        let grid = SearchGrid {
            ranks: ParamRange::new(0, 2, 2).unwrap(),
            iterations: ParamRange::single(5),
        };
        let search = HyperparameterSearch::new(CrossValidator::default(), base());
        assert!(search.search(&records(), &grid).is_err());
    }

    #[test]
    fn test_cancelled_search() {
        let token = CancellationToken::new();
        token.cancel();
        let search = HyperparameterSearch::new(CrossValidator::default(), base()).with_cancellation(token);
        let err = search.search(&records(), &SearchGrid::default()).unwrap_err();
        assert!(matches!(err, EvaluationError::Cancelled));
    }

    #[test]
    fn test_tie_breaks() {
        let result = |iterations, rmse, r_squared| SearchResult {
            config: base().with_iterations(iterations),
            metrics: AggregatedMetrics { rmse, r_squared, folds: vec![] },
        };
        let mut results = vec![
            result(20, 1.0, 0.5),
            result(10, 1.0, 0.5),
            result(5, 0.9, 0.5),
            result(50, 2.0, 0.7),
        ];
        results.sort_by(rank_results);
        let order: Vec<usize> = results.iter().map(|r| r.config.iterations).collect();
        assert_eq!(order, vec![50, 5, 10, 20]);
    }
}
