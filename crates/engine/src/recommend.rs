//! Top-N restaurant recommendation from a trained service.

use std::collections::HashSet;

use factorization::{PredictionService, Result};
use serde::Serialize;

/// One recommended restaurant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantRecommendation {
    pub restaurant: String,
    pub score: f64,
}

/// Highest-scoring restaurants `user_id` has not rated yet.
///
/// Results are sorted by predicted score, highest first; equal scores keep
/// encoder order. An unknown user fails with `UnknownIdentifier`.
pub fn recommend(
    service: &PredictionService,
    user_id: &str,
    rated: &HashSet<&str>,
    limit: usize,
) -> Result<Vec<RestaurantRecommendation>> {
    let encoder = service.encoder();
    let mut scored: Vec<(usize, f64)> = service
        .score_all_items(user_id)?
        .into_iter()
        .filter(|&(item, _)| {
            encoder
                .item_id(item)
                .is_some_and(|name| !rated.contains(name))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .filter_map(|(item, score)| {
            Some(RestaurantRecommendation {
                restaurant: encoder.item_id(item)?.to_string(),
                score,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingRecord;
    use factorization::{EncoderTable, FactorizationError, TrainingConfig, fit};

    fn service() -> PredictionService {
        let records = vec![
            RatingRecord::new("U1", "R1", 5.0),
            RatingRecord::new("U1", "R2", 1.0),
            RatingRecord::new("U2", "R1", 4.0),
            RatingRecord::new("U2", "R3", 2.0),
            RatingRecord::new("U2", "R4", 5.0),
        ];
        let table = EncoderTable::build(&records).unwrap();
        let config = TrainingConfig::default().with_rank(3).with_iterations(30);
        let model = fit(&records, &table, &config).unwrap();
        PredictionService::new(model, table)
    }

    #[test]
    fn test_skips_rated_restaurants() {
        let rated: HashSet<&str> = ["R1", "R2"].into_iter().collect();
        let recs = recommend(&service(), "U1", &rated, 10).unwrap();
        let names: Vec<&str> = recs.iter().map(|r| r.restaurant.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"R3") && names.contains(&"R4"));
        assert!(recs[0].score >= recs[1].score);
    }

    #[test]
    fn test_limit_truncates() {
        let recs = recommend(&service(), "U1", &HashSet::new(), 3).unwrap();
        assert_eq!(recs.len(), 3);
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_unknown_user() {
        let err = recommend(&service(), "U9", &HashSet::new(), 5).unwrap_err();
        assert!(matches!(err, FactorizationError::UnknownIdentifier { .. }));
    }
}
