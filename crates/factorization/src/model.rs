//! Latent factor model: per-user and per-restaurant vectors plus biases.

use crate::encoder::Namespace;
use crate::error::{FactorizationError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Half-width of the uniform range factors are drawn from
const INIT_SCALE: f64 = 0.1;

/// Trained (or in-training) factor matrices.
///
/// Factors are stored row-major in flat vectors: row `u` of the user matrix
/// is `user_factors[u * rank..(u + 1) * rank]`. Only the trainer mutates a
/// model; callers get read-only access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorModel {
    rank: usize,
    num_users: usize,
    num_items: usize,
    use_bias: bool,
    global_bias: f64,
    user_factors: Vec<f64>,
    item_factors: Vec<f64>,
    user_bias: Vec<f64>,
    item_bias: Vec<f64>,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl FactorModel {
    /// Allocate a model with factors uniform in [-0.1, 0.1] and zero biases.
    ///
    /// The same seed always yields the same initial factors.
    pub fn initialize(num_users: usize, num_items: usize, rank: usize, use_bias: bool, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = |len: usize| -> Vec<f64> {
            (0..len)
                .map(|_| rng.random_range(-INIT_SCALE..=INIT_SCALE))
                .collect()
        };
        let user_factors = draw(num_users * rank);
        let item_factors = draw(num_items * rank);

        Self {
            rank,
            num_users,
            num_items,
            use_bias,
            global_bias: 0.0,
            user_factors,
            item_factors,
            user_bias: vec![0.0; num_users],
            item_bias: vec![0.0; num_items],
        }
    }

    fn check_index(&self, namespace: Namespace, index: usize) -> Result<()> {
        let len = match namespace {
            Namespace::User => self.num_users,
            Namespace::Item => self.num_items,
        };
        if index >= len {
            return Err(FactorizationError::IndexOutOfRange { namespace, index, len });
        }
        Ok(())
    }

    /// Predicted rating for an encoded (user, restaurant) pair
    pub fn predict(&self, user: usize, item: usize) -> Result<f64> {
        self.check_index(Namespace::User, user)?;
        self.check_index(Namespace::Item, item)?;
        Ok(self.score(user, item))
    }

    /// Unchecked scoring used inside the training loop
    pub(crate) fn score(&self, user: usize, item: usize) -> f64 {
        let interaction = dot(self.user_row(user), self.item_row(item));
        if self.use_bias {
            self.global_bias + self.user_bias[user] + self.item_bias[item] + interaction
        } else {
            interaction
        }
    }

    fn user_row(&self, user: usize) -> &[f64] {
        &self.user_factors[user * self.rank..(user + 1) * self.rank]
    }

    fn item_row(&self, item: usize) -> &[f64] {
        &self.item_factors[item * self.rank..(item + 1) * self.rank]
    }

    /// One SGD step on a single observation; returns the pre-update error.
    ///
    /// Both factor rows are updated from their values before the step.
    pub(crate) fn sgd_step(&mut self, user: usize, item: usize, rating: f64, learning_rate: f64, regularization: f64) -> f64 {
        let error = rating - self.score(user, item);
        let rank = self.rank;
        let user_row = &mut self.user_factors[user * rank..(user + 1) * rank];
        let item_row = &mut self.item_factors[item * rank..(item + 1) * rank];

        for (uf, itf) in user_row.iter_mut().zip(item_row.iter_mut()) {
            let (u, i) = (*uf, *itf);
            *uf += learning_rate * (error * i - regularization * u);
            *itf += learning_rate * (error * u - regularization * i);
        }

        if self.use_bias {
            self.user_bias[user] += learning_rate * (error - regularization * self.user_bias[user]);
            self.item_bias[item] += learning_rate * (error - regularization * self.item_bias[item]);
            self.global_bias += learning_rate * error;
        }
        error
    }

    /// True when every factor and bias is a finite number
    pub fn is_finite(&self) -> bool {
        self.global_bias.is_finite()
            && self.user_factors.iter().all(|v| v.is_finite())
            && self.item_factors.iter().all(|v| v.is_finite())
            && self.user_bias.iter().all(|v| v.is_finite())
            && self.item_bias.iter().all(|v| v.is_finite())
    }

    /// Check that stored vectors match the declared dimensions
    pub(crate) fn shape_is_consistent(&self) -> bool {
        self.rank >= 1
            && self.user_factors.len() == self.num_users * self.rank
            && self.item_factors.len() == self.num_items * self.rank
            && self.user_bias.len() == self.num_users
            && self.item_bias.len() == self.num_items
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_users(&self) -> usize {
        self.num_users
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn uses_bias(&self) -> bool {
        self.use_bias
    }

    pub fn global_bias(&self) -> f64 {
        self.global_bias
    }

    pub fn user_factors(&self, user: usize) -> Option<&[f64]> {
        (user < self.num_users).then(|| self.user_row(user))
    }

    pub fn item_factors(&self, item: usize) -> Option<&[f64]> {
        (item < self.num_items).then(|| self.item_row(item))
    }

    pub fn user_bias(&self, user: usize) -> Option<f64> {
        self.user_bias.get(user).copied()
    }

    pub fn item_bias(&self, item: usize) -> Option<f64> {
        self.item_bias.get(item).copied()
    }
}
