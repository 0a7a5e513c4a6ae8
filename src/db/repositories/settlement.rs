//! Writes a [`SettlementPlan`] back to the store.
//!
//! All functions take a generic connection so they run inside the caller's
//! transaction; nothing here commits.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::collections::BTreeMap;

use crate::domain::fixture::format_utc;
use crate::domain::{MatchId, SettlementPlan, UserId};
use crate::entities::{matches, predictions, users};

/// Applies the plan: prediction outcomes, user totals, then the match's
/// `settled_at` stamp.
///
/// Prediction updates are grouped by outcome so a match costs a handful of
/// statements no matter how many predictions it has.
pub async fn apply_plan<C: ConnectionTrait>(
    conn: &C,
    plan: &SettlementPlan,
    now: DateTime<Utc>,
) -> Result<()> {
    let stamp = format_utc(now);

    let mut by_outcome: BTreeMap<(bool, i32), Vec<i32>> = BTreeMap::new();
    for award in &plan.awards {
        by_outcome
            .entry((award.is_correct, award.points_awarded))
            .or_default()
            .push(award.prediction_id);
    }

    for ((is_correct, points), ids) in by_outcome {
        predictions::Entity::update_many()
            .col_expr(predictions::Column::IsCorrect, Expr::value(is_correct))
            .col_expr(predictions::Column::PointsAwarded, Expr::value(points))
            .col_expr(predictions::Column::UpdatedAt, Expr::value(stamp.clone()))
            .filter(predictions::Column::Id.is_in(ids))
            .exec(conn)
            .await
            .context("Failed to update settled predictions")?;
    }

    apply_user_deltas(conn, &plan.user_deltas, now).await?;
    mark_settled(conn, plan.match_id, now).await
}

/// Adds each delta to the user's running total, one statement per distinct delta.
pub async fn apply_user_deltas<C: ConnectionTrait>(
    conn: &C,
    deltas: &BTreeMap<UserId, i32>,
    now: DateTime<Utc>,
) -> Result<()> {
    let stamp = format_utc(now);

    let mut by_delta: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for (user, delta) in deltas {
        if *delta != 0 {
            by_delta.entry(*delta).or_default().push(user.value());
        }
    }

    for (delta, ids) in by_delta {
        users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).add(delta),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(stamp.clone()))
            .filter(users::Column::Id.is_in(ids))
            .exec(conn)
            .await
            .context("Failed to update user points")?;
    }

    Ok(())
}

pub async fn mark_settled<C: ConnectionTrait>(
    conn: &C,
    match_id: MatchId,
    now: DateTime<Utc>,
) -> Result<()> {
    matches::Entity::update_many()
        .col_expr(matches::Column::SettledAt, Expr::value(format_utc(now)))
        .filter(matches::Column::Id.eq(match_id.value()))
        .exec(conn)
        .await
        .context("Failed to stamp match as settled")?;

    Ok(())
}
