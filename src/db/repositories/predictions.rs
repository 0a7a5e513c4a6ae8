use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::collections::HashSet;

use super::matches::MatchRepository;
use crate::domain::fixture::{format_utc, parse_utc};
use crate::domain::{BatchItem, Match, MatchId, Prediction, Scoreline, UserId};
use crate::entities::{matches, predictions};

/// A prediction together with the fixture it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionWithMatch {
    pub prediction: Prediction,
    pub fixture: Match,
}

pub struct PredictionRepository {
    conn: DatabaseConnection,
}

impl PredictionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: predictions::Model) -> Result<Prediction> {
        Ok(Prediction {
            id: m.id,
            user_id: UserId::new(m.user_id),
            match_id: MatchId::new(m.match_id),
            predicted: Scoreline::new(m.home_score_bet, m.away_score_bet),
            is_correct: m.is_correct,
            points_awarded: m.points_awarded,
            created_at: parse_utc(&m.created_at)
                .with_context(|| format!("Prediction {} has an unreadable created_at", m.id))?,
            updated_at: parse_utc(&m.updated_at)
                .with_context(|| format!("Prediction {} has an unreadable updated_at", m.id))?,
        })
    }

    fn map_joined(
        rows: Vec<(predictions::Model, Option<matches::Model>)>,
    ) -> Result<Vec<PredictionWithMatch>> {
        rows.into_iter()
            .filter_map(|(p, m)| m.map(|m| (p, m)))
            .map(|(p, m)| {
                Ok(PredictionWithMatch {
                    prediction: Self::map_model(p)?,
                    fixture: MatchRepository::map_model(m)?,
                })
            })
            .collect()
    }

    /// Every prediction of a user, in kickoff order.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<PredictionWithMatch>> {
        let rows = predictions::Entity::find()
            .find_also_related(matches::Entity)
            .filter(predictions::Column::UserId.eq(user_id.value()))
            .order_by_asc(matches::Column::Kickoff)
            .order_by_asc(predictions::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list predictions by user")?;

        Self::map_joined(rows)
    }

    pub async fn list_by_user_and_round(
        &self,
        user_id: UserId,
        round: i32,
    ) -> Result<Vec<PredictionWithMatch>> {
        let rows = predictions::Entity::find()
            .find_also_related(matches::Entity)
            .filter(predictions::Column::UserId.eq(user_id.value()))
            .filter(matches::Column::Round.eq(round))
            .order_by_asc(matches::Column::Kickoff)
            .order_by_asc(predictions::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list predictions by round")?;

        Self::map_joined(rows)
    }

    pub async fn get_for_user_and_match(
        &self,
        user_id: UserId,
        match_id: MatchId,
    ) -> Result<Option<Prediction>> {
        predictions::Entity::find()
            .filter(predictions::Column::UserId.eq(user_id.value()))
            .filter(predictions::Column::MatchId.eq(match_id.value()))
            .one(&self.conn)
            .await
            .context("Failed to query prediction")?
            .map(Self::map_model)
            .transpose()
    }

    // ========================================================================
    // Transaction-scoped operations
    // ========================================================================

    /// Which of `match_ids` the user has already predicted.
    pub async fn predicted_match_ids<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
        match_ids: &[MatchId],
    ) -> Result<HashSet<MatchId>> {
        if match_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<i32> = predictions::Entity::find()
            .select_only()
            .column(predictions::Column::MatchId)
            .filter(predictions::Column::UserId.eq(user_id.value()))
            .filter(predictions::Column::MatchId.is_in(match_ids.iter().map(|id| id.value())))
            .into_tuple()
            .all(conn)
            .await
            .context("Failed to query existing predictions")?;

        Ok(ids.into_iter().map(MatchId::new).collect())
    }

    /// Inserts every item. The caller owns the transaction, so a failure on
    /// any row leaves nothing behind once it is rolled back.
    ///
    /// The raw `DbErr` stays reachable through the returned error, which lets
    /// the caller recognise unique-index violations.
    pub async fn insert_batch<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
        items: &[BatchItem],
        now: DateTime<Utc>,
    ) -> Result<Vec<Prediction>> {
        let stamp = format_utc(now);
        let mut created = Vec::with_capacity(items.len());

        for item in items {
            let active = predictions::ActiveModel {
                user_id: Set(user_id.value()),
                match_id: Set(item.match_id.value()),
                home_score_bet: Set(item.score.home),
                away_score_bet: Set(item.score.away),
                is_correct: Set(None),
                points_awarded: Set(0),
                created_at: Set(stamp.clone()),
                updated_at: Set(stamp.clone()),
                ..Default::default()
            };

            let model = active
                .insert(conn)
                .await
                .with_context(|| format!("Failed to insert prediction for match {}", item.match_id))?;
            created.push(Self::map_model(model)?);
        }

        Ok(created)
    }

    /// All predictions tied to a match, in insertion order.
    pub async fn for_match<C: ConnectionTrait>(
        conn: &C,
        match_id: MatchId,
    ) -> Result<Vec<Prediction>> {
        predictions::Entity::find()
            .filter(predictions::Column::MatchId.eq(match_id.value()))
            .order_by_asc(predictions::Column::Id)
            .all(conn)
            .await
            .context("Failed to load predictions for settlement")?
            .into_iter()
            .map(Self::map_model)
            .collect()
    }
}
