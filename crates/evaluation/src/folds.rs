//! Reproducible k-fold partitioning.

use crate::error::{EvaluationError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Split `0..n` into `k` disjoint folds.
///
/// Positions are shuffled with a seeded RNG and position `p` goes to fold
/// `p % k`, so fold sizes differ by at most one and the same seed always
/// gives the same folds. Indices inside each fold are sorted. `k == 0` is
/// rejected with `InvalidConfiguration`.
pub fn partition(n: usize, k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k == 0 {
        return Err(EvaluationError::InvalidConfiguration(
            "cannot partition records into 0 folds".to_string(),
        ));
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut folds = vec![Vec::with_capacity(n / k + 1); k];
    for (position, idx) in order.into_iter().enumerate() {
        folds[position % k].push(idx);
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Fold number of every index, the inverse of `partition`
pub fn assignments(folds: &[Vec<usize>], n: usize) -> Vec<usize> {
    let mut fold_of = vec![0; n];
    for (fold, members) in folds.iter().enumerate() {
        for &idx in members {
            fold_of[idx] = fold;
        }
    }
    fold_of
}
