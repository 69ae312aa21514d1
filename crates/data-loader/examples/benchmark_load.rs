//! Compares strict and skip-invalid loading of a ratings file.
//!
//! Run with: cargo run --example benchmark_load -p data-loader [-- path/to/ratings.tsv]
//!
//! Without a path, a synthetic 200k-row file with one malformed row in 500 is
//! written to a temporary directory.

use data_loader::{LoadOptions, RatingDataset};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const ROWS: usize = 200_000;
const BAD_EVERY: usize = 500;

fn write_synthetic(dir: &Path) -> PathBuf {
    let path = dir.join("ratings.tsv");
    let mut out = std::io::BufWriter::new(std::fs::File::create(&path).expect("create ratings file"));
    writeln!(out, "UserId\tRestaurantName\tTotalRating").unwrap();
    for row in 0..ROWS {
        if row % BAD_EVERY == BAD_EVERY - 1 {
            writeln!(out, "U{}\tRestaurant {}\tn/a", row % 1500, row % 900).unwrap();
        } else {
            writeln!(out, "U{}\tRestaurant {}\t{}", row % 1500, row % 900, row % 5).unwrap();
        }
    }
    out.flush().unwrap();
    path
}

fn timed(path: &Path, options: &LoadOptions) -> (Duration, Result<RatingDataset, String>) {
    let start = Instant::now();
    let result = RatingDataset::load_from_file(path, options).map_err(|e| e.to_string());
    (start.elapsed(), result)
}

fn main() {
    let scratch = tempfile::tempdir().expect("create scratch dir");
    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => write_synthetic(scratch.path()),
    };
    println!("Loading {}\n", path.display());

    let (strict_time, strict) = timed(&path, &LoadOptions::default());
    match &strict {
        Ok(dataset) => println!("strict:       {} ratings in {:?}", dataset.len(), strict_time),
        Err(reason) => println!("strict:       rejected after {:?} ({})", strict_time, reason),
    }

    let (lenient_time, lenient) = timed(&path, &LoadOptions::default().with_skip_invalid(true));
    let dataset = lenient.expect("skip-invalid load failed");
    let (users, restaurants, ratings) = dataset.counts();
    println!("skip-invalid: {} ratings in {:?}", ratings, lenient_time);
    println!("              {} users, {} restaurants", users, restaurants);

    if let Ok(strict) = &strict {
        if strict.len() == ratings {
            println!("\nNo rows were skipped");
        }
    }
    println!(
        "\nThroughput (skip-invalid): {:.0} ratings/second",
        ratings as f64 / lenient_time.as_secs_f64()
    );
}
