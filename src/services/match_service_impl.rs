//! `SeaORM` implementation of the `MatchService` trait.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::db::repositories::matches::MatchRepository;
use crate::db::{NewMatch, Store};
use crate::domain::{Match, MatchId, MatchStatus, ResultEntry};
use crate::services::match_service::{MatchError, MatchService, RecordedResult};
use crate::services::settlement::{SettlementEngine, SettlementSummary};

const MAX_TEAM_NAME_LEN: usize = 100;

pub struct SeaOrmMatchService {
    store: Store,
    settlement: SettlementEngine,
    pool: PoolConfig,
}

impl SeaOrmMatchService {
    #[must_use]
    pub const fn new(store: Store, settlement: SettlementEngine, pool: PoolConfig) -> Self {
        Self {
            store,
            settlement,
            pool,
        }
    }

    fn validate_round(&self, round: i32) -> Result<(), MatchError> {
        if !(1..=self.pool.max_round).contains(&round) {
            return Err(MatchError::Validation(format!(
                "Invalid round: {round}. Round must be between 1 and {}",
                self.pool.max_round
            )));
        }
        Ok(())
    }

    fn validate_entry(&self, entry: &ResultEntry) -> Result<(), MatchError> {
        if let Some(score) = entry.score
            && !score.is_valid(self.pool.max_score)
        {
            return Err(MatchError::Validation(format!(
                "Invalid score {score}: goals must be between 0 and {}",
                self.pool.max_score
            )));
        }
        Ok(())
    }
}

fn normalize_team(name: &str, side: &str) -> Result<String, MatchError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MatchError::Validation(format!(
            "{side} team name cannot be empty"
        )));
    }
    // Names are written to one CSV line on export.
    if trimmed.chars().any(char::is_control) {
        return Err(MatchError::Validation(format!(
            "{side} team name cannot contain line breaks or control characters"
        )));
    }
    if trimmed.chars().count() > MAX_TEAM_NAME_LEN {
        return Err(MatchError::Validation(format!(
            "{side} team name must be {MAX_TEAM_NAME_LEN} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

/// The result is already committed when the match is read back, so a failed
/// re-read falls back to the committed state instead of failing the call.
fn stored_or_committed(
    id: MatchId,
    reloaded: anyhow::Result<Option<Match>>,
    committed: Match,
) -> Match {
    match reloaded {
        Ok(Some(stored)) => stored,
        Ok(None) => committed,
        Err(e) => {
            warn!(
                event = "result_reload_failed",
                match_id = id.value(),
                error = %format!("{e:#}"),
                "Could not reload match after recording its result"
            );
            committed
        }
    }
}

#[async_trait]
impl MatchService for SeaOrmMatchService {
    async fn create_match(&self, new: NewMatch) -> Result<Match, MatchError> {
        self.validate_round(new.round)?;
        let home_team = normalize_team(&new.home_team, "Home")?;
        let away_team = normalize_team(&new.away_team, "Away")?;

        if home_team.eq_ignore_ascii_case(&away_team) {
            return Err(MatchError::Validation(
                "Home and away teams must be different".to_string(),
            ));
        }

        let fixture = self
            .store
            .create_match(NewMatch {
                round: new.round,
                home_team,
                away_team,
                kickoff: new.kickoff,
            })
            .await?;

        info!(
            event = "match_created",
            match_id = fixture.id.value(),
            round = fixture.round,
            kickoff = %fixture.kickoff,
            "Created match {}",
            fixture.label()
        );

        Ok(fixture)
    }

    async fn get_match(&self, id: MatchId) -> Result<Match, MatchError> {
        self.store
            .get_match(id)
            .await?
            .ok_or(MatchError::NotFound(id))
    }

    async fn list_by_round(&self, round: i32) -> Result<Vec<Match>, MatchError> {
        self.validate_round(round)?;
        let matches = self.store.list_matches_by_round(round).await?;
        if matches.is_empty() {
            return Err(MatchError::RoundNotFound(round));
        }
        Ok(matches)
    }

    async fn list_all(&self) -> Result<Vec<Match>, MatchError> {
        Ok(self.store.list_all_matches().await?)
    }

    async fn list_visible(&self) -> Result<Vec<Match>, MatchError> {
        Ok(self.store.list_visible_matches().await?)
    }

    async fn record_result(
        &self,
        id: MatchId,
        entry: ResultEntry,
    ) -> Result<RecordedResult, MatchError> {
        self.validate_entry(&entry)?;

        let (_writer, txn) = self.store.begin_write().await?;

        let current = MatchRepository::find(&txn, id)
            .await?
            .ok_or(MatchError::NotFound(id))?;
        let transition = current.apply_result(entry)?;

        if transition.fixture == current {
            return Ok(RecordedResult {
                fixture: current,
                settlement: None,
            });
        }

        if !MatchRepository::write_transition(&txn, &transition).await? {
            warn!(
                event = "result_conflict",
                match_id = id.value(),
                "Match changed while its result was being recorded"
            );
            return Err(MatchError::Conflict(format!(
                "Match {id} was updated concurrently, reload and retry"
            )));
        }

        let mut applied = None;
        for event in &transition.events {
            if let Some(plan) = self.settlement.handle(&txn, event).await? {
                applied = Some(plan);
            }
        }

        txn.commit().await?;

        info!(
            event = "result_recorded",
            match_id = id.value(),
            from = %transition.previous_status,
            to = %transition.fixture.status,
            score = ?transition.fixture.final_score,
            "Recorded result for {}",
            transition.fixture.label()
        );

        let settlement = applied.as_ref().map(|plan| {
            SettlementEngine::record(plan);
            SettlementSummary::from(plan)
        });

        let reloaded = MatchRepository::find(&self.store.conn, id).await;
        let fixture = stored_or_committed(id, reloaded, transition.fixture);

        Ok(RecordedResult {
            fixture,
            settlement,
        })
    }

    async fn resettle(&self, id: MatchId) -> Result<SettlementSummary, MatchError> {
        let (_writer, txn) = self.store.begin_write().await?;

        let current = MatchRepository::find(&txn, id)
            .await?
            .ok_or(MatchError::NotFound(id))?;

        let score = match (current.status, current.final_score) {
            (MatchStatus::Finished, Some(score)) => score,
            (MatchStatus::Finished, None) => {
                return Err(MatchError::Internal(format!(
                    "Match {id} is finished but has no final score"
                )));
            }
            (status, _) => {
                return Err(MatchError::Conflict(format!(
                    "Match {id} is {status}; only finished matches can be settled"
                )));
            }
        };

        let plan = self.settlement.settle(&txn, id, score).await?;
        txn.commit().await?;

        SettlementEngine::record(&plan);
        Ok(SettlementSummary::from(&plan))
    }

    async fn delete_match(&self, id: MatchId) -> Result<(), MatchError> {
        if !self.store.delete_match(id).await? {
            return Err(MatchError::NotFound(id));
        }
        info!(event = "match_deleted", match_id = id.value(), "Deleted match");
        Ok(())
    }

    async fn delete_round(&self, round: i32) -> Result<u64, MatchError> {
        self.validate_round(round)?;
        let removed = self.store.delete_round(round).await?;
        if removed == 0 {
            return Err(MatchError::RoundNotFound(round));
        }
        info!(
            event = "round_deleted",
            round,
            removed,
            "Deleted {removed} matches of round {round}"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scoreline;
    use chrono::Utc;

    fn finished() -> Match {
        Match {
            id: MatchId::new(7),
            round: 3,
            home_team: "Bahia".to_string(),
            away_team: "Vitória".to_string(),
            kickoff: Utc::now(),
            status: MatchStatus::Finished,
            final_score: Some(Scoreline::new(2, 0)),
            settled_at: Some(Utc::now()),
        }
    }

    #[test]
    fn committed_result_survives_a_failed_reload() {
        let committed = finished();
        let fixture = stored_or_committed(
            committed.id,
            Err(anyhow::anyhow!("connection reset")),
            committed.clone(),
        );
        assert_eq!(fixture, committed);

        let fixture = stored_or_committed(committed.id, Ok(None), committed.clone());
        assert_eq!(fixture, committed);
    }

    #[test]
    fn team_names_stay_on_one_line() {
        assert_eq!(normalize_team("  Sport Recife ", "Home").unwrap(), "Sport Recife");
        for name in ["Sport\nRecife", "Sport\r\nRecife", "Sport\tRecife"] {
            assert!(matches!(
                normalize_team(name, "Home"),
                Err(MatchError::Validation(_))
            ));
        }
    }

    #[test]
    fn stored_match_wins_when_reload_succeeds() {
        let committed = finished();
        let mut stored = committed.clone();
        stored.home_team = "EC Bahia".to_string();

        let fixture = stored_or_committed(committed.id, Ok(Some(stored.clone())), committed);
        assert_eq!(fixture, stored);
    }
}
