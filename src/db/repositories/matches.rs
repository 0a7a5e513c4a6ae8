use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;

use super::settlement;
use crate::domain::fixture::{format_utc, parse_utc};
use crate::domain::{Match, MatchId, MatchStatus, Scoreline, Transition};
use crate::entities::{matches, predictions};

/// Fields an administrator provides when scheduling a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub round: i32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: chrono::DateTime<chrono::Utc>,
}

pub struct MatchRepository {
    conn: DatabaseConnection,
}

impl MatchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn map_model(m: matches::Model) -> Result<Match> {
        let status: MatchStatus = m
            .status
            .parse()
            .with_context(|| format!("Match {} has an unreadable status", m.id))?;
        let kickoff = parse_utc(&m.kickoff)
            .with_context(|| format!("Match {} has an unreadable kickoff", m.id))?;
        let settled_at = m
            .settled_at
            .as_deref()
            .map(parse_utc)
            .transpose()
            .with_context(|| format!("Match {} has an unreadable settled_at", m.id))?;

        Ok(Match {
            id: MatchId::new(m.id),
            round: m.round,
            home_team: m.home_team,
            away_team: m.away_team,
            kickoff,
            status,
            final_score: Scoreline::from_columns(m.home_score, m.away_score),
            settled_at,
        })
    }

    fn map_all(rows: Vec<matches::Model>) -> Result<Vec<Match>> {
        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn create(&self, new: NewMatch) -> Result<Match> {
        let now = format_utc(chrono::Utc::now());
        let active = matches::ActiveModel {
            round: Set(new.round),
            home_team: Set(new.home_team),
            away_team: Set(new.away_team),
            kickoff: Set(format_utc(new.kickoff)),
            status: Set(MatchStatus::Scheduled.as_str().to_string()),
            home_score: Set(None),
            away_score: Set(None),
            settled_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert match")?;

        Self::map_model(model)
    }

    pub async fn get(&self, id: MatchId) -> Result<Option<Match>> {
        Self::find(&self.conn, id).await
    }

    pub async fn list_by_round(&self, round: i32) -> Result<Vec<Match>> {
        let rows = matches::Entity::find()
            .filter(matches::Column::Round.eq(round))
            .order_by_asc(matches::Column::Kickoff)
            .order_by_asc(matches::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list matches by round")?;

        Self::map_all(rows)
    }

    pub async fn list_all(&self) -> Result<Vec<Match>> {
        let rows = matches::Entity::find()
            .order_by_asc(matches::Column::Round)
            .order_by_asc(matches::Column::Kickoff)
            .order_by_asc(matches::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list matches")?;

        Self::map_all(rows)
    }

    /// Everything a bettor may see: canceled matches are hidden.
    pub async fn list_visible(&self) -> Result<Vec<Match>> {
        let rows = matches::Entity::find()
            .filter(matches::Column::Status.ne(MatchStatus::Canceled.as_str()))
            .order_by_asc(matches::Column::Round)
            .order_by_asc(matches::Column::Kickoff)
            .order_by_asc(matches::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list visible matches")?;

        Self::map_all(rows)
    }

    /// Deletes a match with its predictions. Points already awarded for it are
    /// taken back so every user's total keeps matching their predictions.
    pub async fn delete(&self, id: MatchId) -> Result<bool> {
        let txn = self.conn.begin().await?;
        let removed = Self::delete_where(&txn, matches::Column::Id.eq(id.value())).await?;
        txn.commit().await?;
        Ok(removed > 0)
    }

    pub async fn delete_round(&self, round: i32) -> Result<u64> {
        let txn = self.conn.begin().await?;
        let removed = Self::delete_where(&txn, matches::Column::Round.eq(round)).await?;
        txn.commit().await?;
        Ok(removed)
    }

    async fn delete_where<C: ConnectionTrait>(
        conn: &C,
        condition: sea_orm::sea_query::SimpleExpr,
    ) -> Result<u64> {
        let ids: Vec<i32> = matches::Entity::find()
            .filter(condition)
            .all(conn)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        let doomed = predictions::Entity::find()
            .filter(predictions::Column::MatchId.is_in(ids.clone()))
            .filter(predictions::Column::PointsAwarded.ne(0))
            .all(conn)
            .await?;

        let mut refunds = std::collections::BTreeMap::new();
        for p in &doomed {
            *refunds
                .entry(crate::domain::UserId::new(p.user_id))
                .or_insert(0) -= p.points_awarded;
        }
        settlement::apply_user_deltas(conn, &refunds, chrono::Utc::now()).await?;

        predictions::Entity::delete_many()
            .filter(predictions::Column::MatchId.is_in(ids.clone()))
            .exec(conn)
            .await
            .context("Failed to delete predictions")?;

        let result = matches::Entity::delete_many()
            .filter(matches::Column::Id.is_in(ids))
            .exec(conn)
            .await
            .context("Failed to delete matches")?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Transaction-scoped operations
    // ========================================================================

    pub async fn find<C: ConnectionTrait>(conn: &C, id: MatchId) -> Result<Option<Match>> {
        matches::Entity::find_by_id(id.value())
            .one(conn)
            .await
            .context("Failed to query match")?
            .map(Self::map_model)
            .transpose()
    }

    pub async fn find_many<C: ConnectionTrait>(
        conn: &C,
        ids: &[MatchId],
    ) -> Result<HashMap<MatchId, Match>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = matches::Entity::find()
            .filter(matches::Column::Id.is_in(ids.iter().map(|id| id.value())))
            .all(conn)
            .await
            .context("Failed to query matches by id")?;

        rows.into_iter()
            .map(|m| Self::map_model(m).map(|m| (m.id, m)))
            .collect()
    }

    /// Persists a transition with a compare-and-set on the previous status.
    ///
    /// Returns `false` when the row no longer holds `previous_status`, i.e. a
    /// concurrent writer got there first.
    pub async fn write_transition<C: ConnectionTrait>(
        conn: &C,
        transition: &Transition,
    ) -> Result<bool> {
        let fixture = &transition.fixture;
        let (home, away) = fixture
            .final_score
            .map_or((None, None), |s| (Some(s.home), Some(s.away)));

        let result = matches::Entity::update_many()
            .col_expr(
                matches::Column::Status,
                Expr::value(fixture.status.as_str()),
            )
            .col_expr(matches::Column::HomeScore, Expr::value(home))
            .col_expr(matches::Column::AwayScore, Expr::value(away))
            .col_expr(
                matches::Column::UpdatedAt,
                Expr::value(format_utc(chrono::Utc::now())),
            )
            .filter(matches::Column::Id.eq(fixture.id.value()))
            .filter(matches::Column::Status.eq(transition.previous_status.as_str()))
            .exec(conn)
            .await
            .context("Failed to write match transition")?;

        Ok(result.rows_affected == 1)
    }
}
