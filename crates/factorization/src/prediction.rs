//! Answering raw-identifier queries against a trained model.

use crate::config::TrainingConfig;
use crate::encoder::{EncoderTable, Namespace};
use crate::error::Result;
use crate::model::FactorModel;
use crate::snapshot::ModelSnapshot;

/// A trained model together with the encoder it was trained against.
///
/// Queries for identifiers missing from the encoder fail with
/// `UnknownIdentifier`; they are never answered with a bias-only score.
#[derive(Debug, Clone)]
pub struct PredictionService {
    model: FactorModel,
    table: EncoderTable,
}

impl PredictionService {
    pub fn new(model: FactorModel, table: EncoderTable) -> Self {
        Self { model, table }
    }

    /// Predicted rating of `item_id` by `user_id`. The user is resolved first.
    pub fn predict(&self, user_id: &str, item_id: &str) -> Result<f64> {
        let user = self.table.encode(user_id, Namespace::User)?;
        let item = self.table.encode(item_id, Namespace::Item)?;
        self.model.predict(user, item)
    }

    /// Score every known restaurant for one user, in item-index order
    pub fn score_all_items(&self, user_id: &str) -> Result<Vec<(usize, f64)>> {
        let user = self.table.encode(user_id, Namespace::User)?;
        (0..self.table.num_items())
            .map(|item| Ok((item, self.model.predict(user, item)?)))
            .collect()
    }

    pub fn model(&self) -> &FactorModel {
        &self.model
    }

    pub fn encoder(&self) -> &EncoderTable {
        &self.table
    }

    /// Persistable copy of this service, tagged with the config it came from
    pub fn snapshot(&self, config: TrainingConfig) -> ModelSnapshot {
        ModelSnapshot::new(config, self.clone())
    }

    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self> {
        snapshot.into_service()
    }

    pub(crate) fn into_parts(self) -> (FactorModel, EncoderTable) {
        (self.model, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::error::FactorizationError;
    use crate::trainer::fit;
    use data_loader::RatingRecord;

    fn service() -> PredictionService {
        let records = vec![
            RatingRecord::new("U1", "R1", 5.0),
            RatingRecord::new("U1", "R2", 1.0),
            RatingRecord::new("U2", "R1", 4.0),
        ];
        let table = EncoderTable::build(&records).unwrap();
        let config = TrainingConfig::default().with_rank(4).with_iterations(20);
        let model = fit(&records, &table, &config).unwrap();
        PredictionService::new(model, table)
    }

    #[test]
    fn test_predict_known_pair() {
        let service = service();
        let score = service.predict("U2", "R2").unwrap();
        assert!(score.is_finite());
        assert_eq!(score, service.predict("U2", "R2").unwrap());
    }

    #[test]
    fn test_unknown_user_named() {
        let err = service().predict("U9", "R1").unwrap_err();
        assert!(matches!(
            err,
            FactorizationError::UnknownIdentifier { namespace: Namespace::User, ref id } if id == "U9"
        ));
    }

    #[test]
    fn test_unknown_item_named() {
        let err = service().predict("U1", "Nowhere").unwrap_err();
        assert!(matches!(
            err,
            FactorizationError::UnknownIdentifier { namespace: Namespace::Item, ref id } if id == "Nowhere"
        ));
    }

    #[test]
    fn test_snapshot_conversion() {
        let service = service();
        let config = TrainingConfig::default().with_rank(4).with_iterations(20);
        let restored = PredictionService::from_snapshot(service.snapshot(config)).unwrap();
        assert_eq!(restored.model(), service.model());
        assert_eq!(restored.predict("U1", "R1").unwrap(), service.predict("U1", "R1").unwrap());
    }

    #[test]
    fn test_score_all_items() {
        let service = service();
        let scores = service.score_all_items("U1").unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[1].1, service.predict("U1", "R2").unwrap());
    }
}
