//! Domain service for the prediction ledger.

use thiserror::Error;

use crate::db::{BUSY_MESSAGE, PredictionWithMatch, is_lock_contention};
use crate::domain::{BatchItem, Ineligible, MatchId, Prediction, UserId};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("No prediction found for match {0}")]
    NotFound(MatchId),

    /// Late submission or duplicate. The message names the match.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for PredictionError {
    fn from(err: sea_orm::DbErr) -> Self {
        if is_lock_contention(&err) {
            return Self::Conflict(BUSY_MESSAGE.to_string());
        }
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PredictionError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some_and(is_lock_contention) {
            return Self::Conflict(BUSY_MESSAGE.to_string());
        }
        Self::Database(format!("{err:#}"))
    }
}

impl From<Ineligible> for PredictionError {
    fn from(err: Ineligible) -> Self {
        match err {
            Ineligible::MatchNotFound(id) => Self::MatchNotFound(id),
            Ineligible::AlreadyStarted { .. } | Ineligible::AlreadyPredicted { .. } => {
                Self::Conflict(err.to_string())
            }
        }
    }
}

#[async_trait::async_trait]
pub trait PredictionService: Send + Sync {
    /// Stores a batch of predictions for one user, all or nothing.
    ///
    /// # Errors
    ///
    /// - [`PredictionError::Validation`] for an empty or oversized batch,
    ///   repeated match ids or out-of-range scores.
    /// - [`PredictionError::MatchNotFound`] if any referenced match is absent.
    /// - [`PredictionError::Conflict`] if any match has started or was
    ///   already predicted by this user.
    async fn submit_batch(
        &self,
        user_id: UserId,
        items: Vec<BatchItem>,
    ) -> Result<Vec<Prediction>, PredictionError>;

    /// Single-item convenience over [`PredictionService::submit_batch`].
    async fn submit(&self, user_id: UserId, item: BatchItem)
    -> Result<Prediction, PredictionError>;

    async fn list_by_user(&self, user_id: UserId)
    -> Result<Vec<PredictionWithMatch>, PredictionError>;

    /// A user's predictions for one round, in kickoff order.
    async fn list_by_user_and_round(
        &self,
        user_id: UserId,
        round: i32,
    ) -> Result<Vec<PredictionWithMatch>, PredictionError>;

    async fn get_for_user_and_match(
        &self,
        user_id: UserId,
        match_id: MatchId,
    ) -> Result<Prediction, PredictionError>;
}
