//! Engine crate for the restaurant recommender.
//!
//! This crate contains the orchestrator that runs evaluation, tuning and the
//! headline fit over a loaded dataset, plus top-N recommendation.

pub mod orchestrator;
pub mod recommend;

pub use orchestrator::RecommenderOrchestrator;
pub use recommend::{RestaurantRecommendation, recommend};
