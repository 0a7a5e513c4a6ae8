//! Domain service for the match registry.
//!
//! Owns match creation, result entry and deletion. Result entry drives the
//! match state machine and hands every emitted event to the settlement engine
//! inside the same transaction.

use thiserror::Error;

use crate::db::{BUSY_MESSAGE, NewMatch, is_lock_contention};
use crate::domain::{Match, MatchId, ResultEntry, TransitionError};
use crate::services::settlement::SettlementSummary;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Match {0} not found")]
    NotFound(MatchId),

    #[error("No matches found for round {0}")]
    RoundNotFound(i32),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for MatchError {
    fn from(err: sea_orm::DbErr) -> Self {
        if is_lock_contention(&err) {
            return Self::Conflict(BUSY_MESSAGE.to_string());
        }
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MatchError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<sea_orm::DbErr>().is_some_and(is_lock_contention) {
            return Self::Conflict(BUSY_MESSAGE.to_string());
        }
        Self::Database(format!("{err:#}"))
    }
}

impl From<TransitionError> for MatchError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Illegal { .. } => Self::Conflict(err.to_string()),
            TransitionError::MissingScore
            | TransitionError::UnexpectedScore
            | TransitionError::NegativeScore(_)
            | TransitionError::InvalidTarget(_) => Self::Validation(err.to_string()),
        }
    }
}

/// What `record_result` reports back.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordedResult {
    pub fixture: Match,
    /// Present only when this call settled the match.
    pub settlement: Option<SettlementSummary>,
}

#[async_trait::async_trait]
pub trait MatchService: Send + Sync {
    /// Schedules a new match.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Validation`] for an out-of-range round or bad team names.
    async fn create_match(&self, new: NewMatch) -> Result<Match, MatchError>;

    async fn get_match(&self, id: MatchId) -> Result<Match, MatchError>;

    /// Matches of one round in kickoff order.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::RoundNotFound`] when the round holds no matches.
    async fn list_by_round(&self, round: i32) -> Result<Vec<Match>, MatchError>;

    async fn list_all(&self) -> Result<Vec<Match>, MatchError>;

    /// Every match except canceled ones.
    async fn list_visible(&self) -> Result<Vec<Match>, MatchError>;

    /// Applies a result entry to a match.
    ///
    /// Settlement runs only when the match crosses from `Scheduled` into
    /// `Finished`; correcting the score of a finished match does not settle
    /// again (see [`MatchService::resettle`]).
    ///
    /// # Errors
    ///
    /// - [`MatchError::NotFound`] if the match does not exist.
    /// - [`MatchError::Validation`] for malformed entries.
    /// - [`MatchError::Conflict`] for transitions out of a terminal state or
    ///   when a concurrent writer changed the match first.
    async fn record_result(
        &self,
        id: MatchId,
        entry: ResultEntry,
    ) -> Result<RecordedResult, MatchError>;

    /// Recomputes every prediction of a finished match against its current
    /// score and moves only the point difference. Repeating it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Conflict`] unless the match is finished.
    async fn resettle(&self, id: MatchId) -> Result<SettlementSummary, MatchError>;

    async fn delete_match(&self, id: MatchId) -> Result<(), MatchError>;

    /// Deletes every match of a round and returns how many were removed.
    async fn delete_round(&self, round: i32) -> Result<u64, MatchError>;
}
