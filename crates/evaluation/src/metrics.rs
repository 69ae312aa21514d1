//! Regression metrics over a held-out split.

use serde::{Deserialize, Serialize};

/// Error metrics for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub r_squared: f64,
}

/// Metrics for one cross-validation fold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub fold: usize,
    /// Records evaluated in this fold
    pub held_out: usize,
    /// Records the fold's model was trained on
    pub trained_on: usize,
    pub metrics: Metrics,
    /// Empty fold or constant ratings (R² reported as 0)
    pub degenerate: bool,
}

/// Fold metrics and their means
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub rmse: f64,
    pub r_squared: f64,
    pub folds: Vec<FoldMetrics>,
}

impl AggregatedMetrics {
    /// Average over folds that held out at least one record.
    ///
    /// Returns `None` when no fold has records.
    pub fn from_folds(folds: Vec<FoldMetrics>) -> Option<Self> {
        let scored: Vec<&FoldMetrics> = folds.iter().filter(|f| f.held_out > 0).collect();
        if scored.is_empty() {
            return None;
        }
        let n = scored.len() as f64;
        let rmse = scored.iter().map(|f| f.metrics.rmse).sum::<f64>() / n;
        let r_squared = scored.iter().map(|f| f.metrics.r_squared).sum::<f64>() / n;
        Some(Self { rmse, r_squared, folds })
    }
}

/// Compute RMSE and R² for paired actual/predicted values.
///
/// R² uses the mean of `actual` as the baseline. When every actual value is
/// the same R² is reported as 0 and the flag is set. Constancy is read from
/// the ratings themselves, not from SS_tot, whose rounding residue is not
/// zero for values like 0.1. Empty input yields `None`.
pub fn regression_metrics(pairs: &[(f64, f64)]) -> Option<(Metrics, bool)> {
    if pairs.is_empty() {
        return None;
    }
    let n = pairs.len() as f64;
    let mean = pairs.iter().map(|(actual, _)| actual).sum::<f64>() / n;

    let ss_res: f64 = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = pairs.iter().map(|(a, _)| (a - mean).powi(2)).sum();

    let rmse = (ss_res / n).sqrt();
    let first = pairs[0].0;
    let constant = pairs.iter().all(|&(actual, _)| actual == first);
    let r_squared = if constant { 0.0 } else { 1.0 - ss_res / ss_tot };

    Some((Metrics { rmse, r_squared }, constant))
}
