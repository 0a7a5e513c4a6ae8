//! `SeaORM` implementation of the `PredictionService` trait.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DbErr, SqlErr};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::db::repositories::matches::MatchRepository;
use crate::db::repositories::predictions::PredictionRepository;
use crate::db::{PredictionWithMatch, Store};
use crate::domain::{BatchItem, Ineligible, Match, MatchId, Prediction, UserId, eligibility};
use crate::services::prediction_service::{PredictionError, PredictionService};

pub struct SeaOrmPredictionService {
    store: Store,
    pool: PoolConfig,
}

impl SeaOrmPredictionService {
    #[must_use]
    pub const fn new(store: Store, pool: PoolConfig) -> Self {
        Self { store, pool }
    }

    fn validate_batch(&self, items: &[BatchItem]) -> Result<(), PredictionError> {
        if items.is_empty() {
            return Err(PredictionError::Validation(
                "At least one prediction is required".to_string(),
            ));
        }

        if items.len() > self.pool.max_batch_size {
            return Err(PredictionError::Validation(format!(
                "At most {} predictions can be submitted at once",
                self.pool.max_batch_size
            )));
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.match_id) {
                return Err(PredictionError::Validation(format!(
                    "Match {} appears more than once in the submission",
                    item.match_id
                )));
            }
            if !item.score.is_valid(self.pool.max_score) {
                return Err(PredictionError::Validation(format!(
                    "Invalid prediction {} for match {}: goals must be between 0 and {}",
                    item.score, item.match_id, self.pool.max_score
                )));
            }
        }

        Ok(())
    }
}

/// Maps a unique-index violation on (user, match) to the error the serial
/// check reports. SQLite does not say which row collided, so the first item of
/// the batch is named.
fn duplicate_conflict(
    err: &anyhow::Error,
    items: &[BatchItem],
    fixtures: &HashMap<MatchId, Match>,
) -> Option<PredictionError> {
    let db_err = err.downcast_ref::<DbErr>()?;
    if !matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return None;
    }

    let item = items.first()?;
    let fixture = fixtures.get(&item.match_id)?;
    Some(
        Ineligible::AlreadyPredicted {
            match_id: item.match_id,
            fixture: fixture.label(),
        }
        .into(),
    )
}

#[async_trait]
impl PredictionService for SeaOrmPredictionService {
    async fn submit_batch(
        &self,
        user_id: UserId,
        items: Vec<BatchItem>,
    ) -> Result<Vec<Prediction>, PredictionError> {
        self.validate_batch(&items)?;

        let ids: Vec<MatchId> = items.iter().map(|i| i.match_id).collect();
        let (_writer, txn) = self.store.begin_write().await?;

        let fixtures = MatchRepository::find_many(&txn, &ids).await?;
        let predicted = PredictionRepository::predicted_match_ids(&txn, user_id, &ids).await?;
        let now = Utc::now();

        if let Err(reason) = eligibility::check_batch(now, &items, &fixtures, &predicted) {
            info!(
                event = "prediction_rejected",
                user_id = user_id.value(),
                match_id = reason.match_id().value(),
                reason = %reason,
                "Rejected prediction batch"
            );
            return Err(reason.into());
        }

        let created = match PredictionRepository::insert_batch(&txn, user_id, &items, now).await {
            Ok(created) => created,
            Err(e) => {
                if let Some(conflict) = duplicate_conflict(&e, &items, &fixtures) {
                    warn!(
                        event = "prediction_race",
                        user_id = user_id.value(),
                        "Concurrent duplicate prediction blocked by unique index"
                    );
                    return Err(conflict);
                }
                return Err(e.into());
            }
        };

        txn.commit().await.map_err(|e| {
            let err = anyhow::Error::new(e);
            duplicate_conflict(&err, &items, &fixtures).unwrap_or_else(|| err.into())
        })?;

        metrics::counter!("predictions_submitted_total").increment(created.len() as u64);
        info!(
            event = "predictions_submitted",
            user_id = user_id.value(),
            count = created.len(),
            "Stored {} predictions",
            created.len()
        );

        Ok(created)
    }

    async fn submit(
        &self,
        user_id: UserId,
        item: BatchItem,
    ) -> Result<Prediction, PredictionError> {
        let mut created = self.submit_batch(user_id, vec![item]).await?;
        created
            .pop()
            .ok_or_else(|| PredictionError::Database("Prediction was not stored".to_string()))
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PredictionWithMatch>, PredictionError> {
        Ok(self.store.list_predictions_by_user(user_id).await?)
    }

    async fn list_by_user_and_round(
        &self,
        user_id: UserId,
        round: i32,
    ) -> Result<Vec<PredictionWithMatch>, PredictionError> {
        if !(1..=self.pool.max_round).contains(&round) {
            return Err(PredictionError::Validation(format!(
                "Invalid round: {round}. Round must be between 1 and {}",
                self.pool.max_round
            )));
        }
        Ok(self
            .store
            .list_predictions_by_user_and_round(user_id, round)
            .await?)
    }

    async fn get_for_user_and_match(
        &self,
        user_id: UserId,
        match_id: MatchId,
    ) -> Result<Prediction, PredictionError> {
        self.store
            .get_prediction(user_id, match_id)
            .await?
            .ok_or(PredictionError::NotFound(match_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewMatch;
    use crate::domain::Scoreline;
    use chrono::Duration;

    #[tokio::test]
    async fn unique_violation_reads_like_the_serial_check() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let admin = store.get_user_by_username("admin").await.unwrap().unwrap();
        let fixture = store
            .create_match(NewMatch {
                round: 1,
                home_team: "Flamengo".to_string(),
                away_team: "Vasco".to_string(),
                kickoff: Utc::now() + Duration::hours(3),
            })
            .await
            .unwrap();

        let items = [BatchItem {
            match_id: fixture.id,
            score: Scoreline::new(1, 0),
        }];
        PredictionRepository::insert_batch(&store.conn, admin.id, &items, Utc::now())
            .await
            .unwrap();
        let err = PredictionRepository::insert_batch(&store.conn, admin.id, &items, Utc::now())
            .await
            .unwrap_err();

        let fixtures = HashMap::from([(fixture.id, fixture.clone())]);
        let conflict = duplicate_conflict(&err, &items, &fixtures).unwrap();
        let serial = PredictionError::from(Ineligible::AlreadyPredicted {
            match_id: fixture.id,
            fixture: fixture.label(),
        });

        assert!(matches!(conflict, PredictionError::Conflict(_)));
        assert_eq!(conflict.to_string(), serial.to_string());
    }
}
