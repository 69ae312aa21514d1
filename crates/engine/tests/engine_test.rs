use std::io::Write;
use std::sync::Arc;

use data_loader::{LoadOptions, RatingDataset};
use engine::RecommenderOrchestrator;
use factorization::{ModelSnapshot, PredictionService, TrainingConfig};

const RATINGS: &str = "UserId\tRestaurantName\tTotalRating
U1\tChilis Cuernavaca\t5
U1\tTortas Locas Hipocampo\t1
U1\tRestaurant Wu Zhuo Yi\t5
U2\tChilis Cuernavaca\t4
U2\tTortas Locas Hipocampo\t2
U2\tCafe Ambar\t4
U3\tTortas Locas Hipocampo\t5
U3\tCafe Ambar\t1
U3\tRestaurant Wu Zhuo Yi\t2
";

fn load() -> Arc<RatingDataset> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RATINGS.as_bytes()).unwrap();
    Arc::new(RatingDataset::load_from_file(file.path(), &LoadOptions::default()).unwrap())
}

fn config() -> TrainingConfig {
    TrainingConfig::default().with_rank(4).with_iterations(50).with_learning_rate(0.05)
}

#[tokio::test]
async fn test_file_to_recommendation() {
    let orchestrator = RecommenderOrchestrator::new(load(), config());
    let service = orchestrator.train().await.unwrap();

    let recommendations = orchestrator.recommend(&service, "U1", 5).unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].restaurant, "Cafe Ambar");
    assert_eq!(
        recommendations[0].score,
        service.predict("U1", "Cafe Ambar").unwrap()
    );
}

#[tokio::test]
async fn test_exported_snapshot_predicts_identically() {
    let orchestrator = RecommenderOrchestrator::new(load(), config());
    let service = orchestrator.train().await.unwrap();
    let expected = service.predict("U3", "Chilis Cuernavaca").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    service.snapshot(*orchestrator.config()).save(&path).unwrap();

    let restored = PredictionService::from_snapshot(ModelSnapshot::load(&path).unwrap()).unwrap();
    let actual = restored.predict("U3", "Chilis Cuernavaca").unwrap();
    assert!((actual - expected).abs() < 1e-12);
}

#[tokio::test]
async fn test_single_fold_rejected() {
    let err = RecommenderOrchestrator::new(load(), config())
        .with_folds(1)
        .evaluate()
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("at least 2 folds"));
}
