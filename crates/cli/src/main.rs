use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{LoadOptions, RatingDataset};
use engine::{RecommenderOrchestrator, RestaurantRecommendation};
use evaluation::{AggregatedMetrics, DEFAULT_FOLDS, ParamRange, SearchGrid, SearchResult};
use factorization::{CancellationToken, TrainingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// RestoRecs - Restaurant Recommendation Engine
#[derive(Parser)]
#[command(name = "resto-recs")]
#[command(about = "Restaurant recommendation engine using matrix factorization", long_about = None)]
struct Cli {
    /// Path to the tab-separated ratings file (UserId, RestaurantName, TotalRating)
    #[arg(short, long, default_value = "data/trainingData.tsv")]
    data_file: PathBuf,

    /// Skip malformed rows instead of failing the load
    #[arg(long)]
    skip_invalid: bool,

    #[command(flatten)]
    training: TrainingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TrainingArgs {
    /// Latent factor dimension
    #[arg(long, default_value_t = TrainingConfig::default().rank)]
    rank: usize,

    /// Training epochs
    #[arg(long, default_value_t = TrainingConfig::default().iterations)]
    iterations: usize,

    #[arg(long, default_value_t = TrainingConfig::default().learning_rate)]
    learning_rate: f64,

    /// L2 penalty on factors and biases
    #[arg(long, default_value_t = TrainingConfig::default().regularization)]
    regularization: f64,

    /// Seed for initialization, shuffling and fold assignment
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Train without user, restaurant and global biases
    #[arg(long)]
    no_bias: bool,

    /// Cross-validation folds
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    folds: usize,
}

impl TrainingArgs {
    fn config(&self) -> TrainingConfig {
        TrainingConfig::default()
            .with_rank(self.rank)
            .with_iterations(self.iterations)
            .with_learning_rate(self.learning_rate)
            .with_regularization(self.regularization)
            .with_seed(self.seed)
            .with_bias(!self.no_bias)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Cross-validate the configured hyperparameters
    Evaluate,

    /// Grid-search rank and iterations, best configuration first
    Tune {
        #[arg(long, default_value_t = 5)]
        iterations_start: usize,

        #[arg(long, default_value_t = 95)]
        iterations_end: usize,

        #[arg(long, default_value_t = 5)]
        iterations_step: usize,

        #[arg(long, default_value_t = 50)]
        rank_start: usize,

        #[arg(long, default_value_t = 200)]
        rank_end: usize,

        #[arg(long, default_value_t = 50)]
        rank_step: usize,
    },

    /// Train on the full dataset and predict one rating
    Predict {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        restaurant: String,
    },

    /// Recommend restaurants a user has not rated yet
    Recommend {
        #[arg(long)]
        user_id: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Train on the full dataset and write a model snapshot
    Export {
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading ratings from {}...", cli.data_file.display());
    let start = Instant::now();
    let options = LoadOptions::default().with_skip_invalid(cli.skip_invalid);
    let dataset = Arc::new(
        RatingDataset::load_from_file(&cli.data_file, &options)
            .context("Failed to load ratings file")?,
    );
    let (users, restaurants, ratings) = dataset.counts();
    println!(
        "{} Loaded {} ratings from {} users over {} restaurants in {:?}",
        "✓".green(),
        ratings,
        users,
        restaurants,
        start.elapsed()
    );

    // Ctrl-C stops training at the next epoch boundary
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling training");
                token.cancel();
            }
        }
    });

    let orchestrator = RecommenderOrchestrator::new(dataset, cli.training.config())
        .with_folds(cli.training.folds)
        .with_cancellation(token);

    match cli.command {
        Commands::Evaluate => handle_evaluate(&orchestrator).await?,
        Commands::Tune {
            iterations_start,
            iterations_end,
            iterations_step,
            rank_start,
            rank_end,
            rank_step,
        } => {
            let grid = SearchGrid {
                ranks: ParamRange::new(rank_start, rank_end, rank_step).context("Invalid rank range")?,
                iterations: ParamRange::new(iterations_start, iterations_end, iterations_step)
                    .context("Invalid iterations range")?,
            };
            handle_tune(&orchestrator, grid).await?
        }
        Commands::Predict { user_id, restaurant } => handle_predict(&orchestrator, &user_id, &restaurant).await?,
        Commands::Recommend { user_id, limit } => handle_recommend(&orchestrator, &user_id, limit).await?,
        Commands::Export { output } => handle_export(&orchestrator, output).await?,
    }

    Ok(())
}

/// Handle the 'evaluate' command
async fn handle_evaluate(orchestrator: &RecommenderOrchestrator) -> Result<()> {
    println!("Cross-validating {}...", orchestrator.config());
    let metrics = orchestrator.evaluate().await?;
    print_metrics("--- Metrics before tuning hyper parameters ---", &metrics);
    Ok(())
}

/// Handle the 'tune' command
async fn handle_tune(orchestrator: &RecommenderOrchestrator, grid: SearchGrid) -> Result<()> {
    println!(
        "Searching {} configurations ({} training runs)...",
        grid.len(),
        grid.len() * orchestrator.folds()
    );
    let start = Instant::now();
    let results = orchestrator.tune(grid).await?;
    println!("{} Search finished in {:?}", "✓".green(), start.elapsed());
    print_search_results(&results);
    Ok(())
}

/// Handle the 'predict' command
async fn handle_predict(orchestrator: &RecommenderOrchestrator, user_id: &str, restaurant: &str) -> Result<()> {
    let service = orchestrator.train().await?;
    let score = service
        .predict(user_id, restaurant)
        .with_context(|| format!("Cannot predict a rating of '{}' for user '{}'", restaurant, user_id))?;
    println!(
        "{} Predicted rating of {} by {}: {}",
        "•".cyan(),
        restaurant.bold(),
        user_id.bold(),
        format!("{:.1}", score).green()
    );
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(orchestrator: &RecommenderOrchestrator, user_id: &str, limit: usize) -> Result<()> {
    let service = orchestrator.train().await?;
    let recommendations = orchestrator.recommend(&service, user_id, limit)?;
    print_recommendations(user_id, &recommendations);
    Ok(())
}

/// Handle the 'export' command
async fn handle_export(orchestrator: &RecommenderOrchestrator, output: PathBuf) -> Result<()> {
    let service = orchestrator.train().await?;
    service
        .snapshot(*orchestrator.config())
        .save(&output)
        .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;
    println!("{} Wrote model snapshot to {}", "✓".green(), output.display());
    Ok(())
}

fn print_metrics(title: &str, metrics: &AggregatedMetrics) {
    println!("{}", title.bold().blue());
    println!("{}RMSE: {:.4}", "• ".green(), metrics.rmse);
    println!("{}R²:   {:.4}", "• ".green(), metrics.r_squared);
    for fold in &metrics.folds {
        let line = format!(
            "  fold {}: rmse {:.4}, r² {:.4} ({} held out)",
            fold.fold + 1,
            fold.metrics.rmse,
            fold.metrics.r_squared,
            fold.held_out
        );
        if fold.degenerate {
            println!("{} {}", line.yellow(), "[degenerate]".yellow());
        } else {
            println!("{}", line);
        }
    }
}

fn print_search_results(results: &[SearchResult]) {
    println!("{}", "--- Hyper parameter search (best first) ---".bold().blue());
    println!("{:>4}  {:>6}  {:>10}  {:>8}  {:>8}", "#", "rank", "iterations", "rmse", "r²");
    for (position, result) in results.iter().enumerate() {
        let row = format!(
            "{:>4}  {:>6}  {:>10}  {:>8.4}  {:>8.4}",
            position + 1,
            result.config.rank,
            result.config.iterations,
            result.metrics.rmse,
            result.metrics.r_squared
        );
        if position == 0 {
            println!("{}", row.green());
        } else {
            println!("{}", row);
        }
    }
}

fn print_recommendations(user_id: &str, recommendations: &[RestaurantRecommendation]) {
    println!("{}", format!("Restaurant recommendations for {}:", user_id).bold().blue());
    if recommendations.is_empty() {
        println!("  (user has rated every known restaurant)");
    }
    for (position, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} - Score: {:.2}",
            (position + 1).to_string().green(),
            rec.restaurant,
            rec.score
        );
    }
}
