//! Integration tests for encoding, training and prediction together.

use data_loader::RatingRecord;
use factorization::{
    EncoderTable, FactorizationError, Namespace, PredictionService, Trainer, TrainingConfig,
};

/// Two taste groups: users 0-4 love restaurants A*, users 5-9 love B*
fn taste_groups() -> Vec<RatingRecord> {
    let mut records = Vec::new();
    for user in 0..10 {
        for item in 0..6 {
            let likes_a = user < 5;
            let is_a = item < 3;
            let rating = if likes_a == is_a { 5.0 } else { 1.0 };
            let name = if is_a { format!("A{}", item) } else { format!("B{}", item) };
            records.push(RatingRecord::new(format!("U{}", user), name, rating));
        }
    }
    records
}

fn config() -> TrainingConfig {
    TrainingConfig::default()
        .with_rank(4)
        .with_iterations(100)
        .with_learning_rate(0.05)
        .with_regularization(0.02)
        .with_seed(3)
}

#[test]
fn test_learns_taste_groups() {
    let records = taste_groups();
    let table = EncoderTable::build(&records).unwrap();
    let model = Trainer::new(config()).fit(&records, &table).unwrap();
    let service = PredictionService::new(model, table);

    assert!(service.predict("U0", "A1").unwrap() > service.predict("U0", "B4").unwrap());
    assert!(service.predict("U7", "B3").unwrap() > service.predict("U7", "A0").unwrap());
}

#[test]
fn test_training_error_drops_with_more_epochs() {
    let records = taste_groups();
    let table = EncoderTable::build(&records).unwrap();

    let rmse = |iterations: usize| {
        let model = Trainer::new(config().with_iterations(iterations))
            .fit(&records, &table)
            .unwrap();
        let squared: f64 = records
            .iter()
            .map(|r| {
                let u = table.encode(&r.user_id, Namespace::User).unwrap();
                let i = table.encode(&r.item_id, Namespace::Item).unwrap();
                (r.rating - model.predict(u, i).unwrap()).powi(2)
            })
            .sum();
        (squared / records.len() as f64).sqrt()
    };

    assert!(rmse(100) < rmse(2));
}

#[test]
fn test_independent_runs_match() {
    let records = taste_groups();
    let table = EncoderTable::build(&records).unwrap();
    let first = Trainer::new(config()).fit(&records, &table).unwrap();
    let second = Trainer::new(config()).fit(&records, &table).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cold_start_query_fails() {
    let records = taste_groups();
    let table = EncoderTable::build(&records).unwrap();
    let model = Trainer::new(config()).fit(&records, &table).unwrap();
    let service = PredictionService::new(model, table);

    assert!(matches!(
        service.predict("CLONED", "A1"),
        Err(FactorizationError::UnknownIdentifier { namespace: Namespace::User, .. })
    ));
}
