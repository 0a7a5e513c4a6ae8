//! Settlement engine.
//!
//! Consumes [`DomainEvent`]s produced by match transitions. It only ever runs
//! on a connection the caller already opened a transaction on, so the
//! prediction updates, the point deltas and the status change commit or roll
//! back together.

use chrono::Utc;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::{error, info};

use crate::db::repositories::predictions::PredictionRepository;
use crate::db::repositories::settlement as store;
use crate::domain::scoring::plan_settlement;
use crate::domain::{DomainEvent, MatchId, Scoreline, SettlementPlan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub match_id: MatchId,
    pub score: String,
    pub predictions: usize,
    pub correct: usize,
    pub points_awarded: i32,
    /// Change to the sum of all users' points caused by this run.
    pub net_change: i32,
}

impl From<&SettlementPlan> for SettlementSummary {
    fn from(plan: &SettlementPlan) -> Self {
        Self {
            match_id: plan.match_id,
            score: plan.score.to_string(),
            predictions: plan.awards.len(),
            correct: plan.correct_count(),
            points_awarded: plan.total_awarded(),
            net_change: plan.net_change(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementEngine;

impl SettlementEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reacts to a single event. Returns the applied plan when the event
    /// settled a match.
    pub async fn handle<C: ConnectionTrait>(
        &self,
        conn: &C,
        event: &DomainEvent,
    ) -> anyhow::Result<Option<SettlementPlan>> {
        match event {
            DomainEvent::MatchFinalized { match_id, score } => {
                self.settle(conn, *match_id, *score).await.map(Some)
            }
            DomainEvent::MatchWithdrawn { match_id, status } => {
                info!(
                    event = "match_withdrawn",
                    match_id = match_id.value(),
                    status = %status,
                    "Match withdrawn, predictions stay unsettled"
                );
                Ok(None)
            }
        }
    }

    /// Loads the match's predictions, scores them and writes the outcome.
    pub async fn settle<C: ConnectionTrait>(
        &self,
        conn: &C,
        match_id: MatchId,
        score: Scoreline,
    ) -> anyhow::Result<SettlementPlan> {
        let result = async {
            let predictions = PredictionRepository::for_match(conn, match_id).await?;
            let plan = plan_settlement(match_id, score, &predictions);
            store::apply_plan(conn, &plan, Utc::now()).await?;
            Ok::<_, anyhow::Error>(plan)
        }
        .await;

        if let Err(e) = &result {
            error!(
                event = "settlement_failed",
                match_id = match_id.value(),
                error = %format!("{e:#}"),
                "Settlement failed, match left unsettled"
            );
        }

        result
    }

    /// Logs and counts a plan once its transaction has committed.
    pub fn record(plan: &SettlementPlan) {
        let granted: i32 = plan.user_deltas.values().filter(|d| **d > 0).sum();
        let points = u64::try_from(granted).unwrap_or(0);

        metrics::counter!("matches_settled_total").increment(1);
        metrics::counter!("points_awarded_total").increment(points);

        info!(
            event = "match_settled",
            match_id = plan.match_id.value(),
            score = %plan.score,
            predictions = plan.awards.len(),
            correct = plan.correct_count(),
            points = plan.total_awarded(),
            net_change = plan.net_change(),
            "Match settled"
        );
    }
}
