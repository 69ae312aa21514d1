//! # Recommender Orchestrator
//!
//! Drives the training and evaluation flow over one loaded dataset:
//! 1. Cross-validate the configured hyperparameters
//! 2. Optionally search a rank x iterations grid
//! 3. Fit the headline model on every record
//! 4. Answer predictions and top-N queries from that model
//!
//! Training is CPU-bound, so every fit or evaluation runs on
//! `tokio::task::spawn_blocking`; cross-validation fans out further on rayon.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use data_loader::RatingDataset;
use evaluation::{AggregatedMetrics, CrossValidator, DEFAULT_FOLDS, HyperparameterSearch, SearchGrid, SearchResult};
use factorization::{CancellationToken, EncoderTable, FactorizationError, PredictionService, Trainer, TrainingConfig};

use crate::recommend::{RestaurantRecommendation, recommend};

/// Coordinates training, evaluation and recommendation for one dataset
#[derive(Debug, Clone)]
pub struct RecommenderOrchestrator {
    dataset: Arc<RatingDataset>,
    config: TrainingConfig,
    folds: usize,
    cancellation: Option<CancellationToken>,
}

impl RecommenderOrchestrator {
    pub fn new(dataset: Arc<RatingDataset>, config: TrainingConfig) -> Self {
        Self {
            dataset,
            config,
            folds: DEFAULT_FOLDS,
            cancellation: None,
        }
    }

    /// Number of cross-validation folds (default: 5)
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn dataset(&self) -> &RatingDataset {
        &self.dataset
    }

    /// Fold seed follows the training seed so one `--seed` pins the whole run
    fn validator(&self) -> CrossValidator {
        let validator = CrossValidator::new(self.folds).with_seed(self.config.seed);
        match &self.cancellation {
            Some(token) => validator.with_cancellation(token.clone()),
            None => validator,
        }
    }

    /// Fit the headline model on the full dataset
    #[instrument(skip_all, fields(config = %self.config))]
    pub async fn train(&self) -> Result<PredictionService> {
        let start_time = Instant::now();
        let dataset = self.dataset.clone();
        let mut trainer = Trainer::new(self.config);
        if let Some(token) = &self.cancellation {
            trainer = trainer.with_cancellation(token.clone());
        }

        let service = tokio::task::spawn_blocking(move || {
            let table = EncoderTable::build(dataset.records())?;
            let model = trainer.fit(dataset.records(), &table)?;
            Ok::<_, FactorizationError>(PredictionService::new(model, table))
        })
        .await
        .context("Training task panicked")?
        .context("Failed to train model")?;

        info!(
            "Trained model on {} ratings in {:.2?}",
            self.dataset.len(),
            start_time.elapsed()
        );
        Ok(service)
    }

    /// Cross-validate the configured hyperparameters
    #[instrument(skip_all, fields(config = %self.config, folds = self.folds))]
    pub async fn evaluate(&self) -> Result<AggregatedMetrics> {
        let start_time = Instant::now();
        let dataset = self.dataset.clone();
        let validator = self.validator();
        let config = self.config;

        let metrics = tokio::task::spawn_blocking(move || validator.cross_validate(dataset.records(), &config))
            .await
            .context("Evaluation task panicked")?
            .context("Cross-validation failed")?;

        info!(
            "Evaluated {} folds in {:.2?}",
            metrics.folds.len(),
            start_time.elapsed()
        );
        Ok(metrics)
    }

    /// Cross-validate every cell of `grid`, best configuration first
    #[instrument(skip_all, fields(cells = grid.len(), folds = self.folds))]
    pub async fn tune(&self, grid: SearchGrid) -> Result<Vec<SearchResult>> {
        let start_time = Instant::now();
        let dataset = self.dataset.clone();
        let search = HyperparameterSearch::new(self.validator(), self.config);

        let results = tokio::task::spawn_blocking(move || search.search(dataset.records(), &grid))
            .await
            .context("Search task panicked")?
            .context("Hyperparameter search failed")?;

        info!(
            "Searched {} configurations in {:.2?}",
            results.len(),
            start_time.elapsed()
        );
        Ok(results)
    }

    /// Cross-validate and fit the headline model concurrently
    pub async fn evaluate_and_train(&self) -> Result<(AggregatedMetrics, PredictionService)> {
        let (metrics, service) = tokio::join!(self.evaluate(), self.train());
        Ok((metrics?, service?))
    }

    /// Top `limit` restaurants `user_id` has not rated in the dataset
    pub fn recommend(
        &self,
        service: &PredictionService,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<RestaurantRecommendation>> {
        let rated: HashSet<&str> = self.dataset.user_items(user_id).into_iter().collect();
        let recommendations = recommend(service, user_id, &rated, limit)
            .with_context(|| format!("Failed to recommend restaurants for user {}", user_id))?;
        info!(
            "Selected {} recommendations for user {} ({} already rated)",
            recommendations.len(),
            user_id,
            rated.len()
        );
        Ok(recommendations)
    }
}
