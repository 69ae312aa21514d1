//! Core domain types for restaurant rating data.
//!
//! A `RatingRecord` is one (user, restaurant, rating) observation and a
//! `RatingDataset` is the ordered, read-only collection handed to training.

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// =============================================================================
// Type Aliases
// =============================================================================

/// Raw user identifier as it appears in the source file (e.g. "U1134")
pub type UserId = String;

/// Raw restaurant identifier, the restaurant name in the source file
pub type ItemId = String;

// =============================================================================
// Rating Type
// =============================================================================

/// A single rating given by a user to a restaurant.
///
/// Several records may share the same (user, restaurant) pair. They are kept
/// as independent observations and never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
}

impl RatingRecord {
    pub fn new(user_id: impl Into<UserId>, item_id: impl Into<ItemId>, rating: f64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
        }
    }
}

// =============================================================================
// RatingDataset - the in-memory corpus
// =============================================================================

/// Ordered collection of rating records.
///
/// The dataset owns its records and only hands out borrows, so the training
/// and evaluation layers can share one copy behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RatingDataset {
    records: Vec<RatingRecord>,
}

impl RatingDataset {
    /// Wrap an already-normalized list of records
    pub fn new(records: Vec<RatingRecord>) -> Self {
        Self { records }
    }

    /// All records in file order
    pub fn records(&self) -> &[RatingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns (distinct users, distinct restaurants, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let users: HashSet<&str> = self.records.iter().map(|r| r.user_id.as_str()).collect();
        let items: HashSet<&str> = self.records.iter().map(|r| r.item_id.as_str()).collect();
        (users.len(), items.len(), self.records.len())
    }

    /// Mean rating over every record, `None` for an empty dataset
    pub fn mean_rating(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let total: f64 = self.records.iter().map(|r| r.rating).sum();
        Some(total / self.records.len() as f64)
    }

    /// Distinct restaurants rated by `user_id`, in first-seen order
    pub fn user_items(&self, user_id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.item_id.as_str())
            .filter(|item| seen.insert(*item))
            .collect()
    }

    /// Check that every record has non-empty identifiers and a finite rating
    pub fn validate(&self) -> Result<()> {
        for record in &self.records {
            if record.user_id.trim().is_empty() {
                return Err(DataLoadError::InvalidValue {
                    field: "user_id".to_string(),
                    value: record.user_id.clone(),
                });
            }
            if record.item_id.trim().is_empty() {
                return Err(DataLoadError::InvalidValue {
                    field: "item_id".to_string(),
                    value: record.item_id.clone(),
                });
            }
            if !record.rating.is_finite() {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: record.rating.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl From<Vec<RatingRecord>> for RatingDataset {
    fn from(records: Vec<RatingRecord>) -> Self {
        Self::new(records)
    }
}
