//! Match lifecycle.
//!
//! ```text
//! SCHEDULED ──► FINISHED   (emits MatchFinalized)
//!     │ ├─────► POSTPONED  (emits MatchWithdrawn)
//!     │ └─────► CANCELED   (emits MatchWithdrawn)
//! ```
//!
//! `FINISHED -> FINISHED` is allowed and only rewrites the scores. Nothing
//! leaves a terminal state otherwise.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use super::{DomainEvent, MatchId, MatchStatus, Scoreline};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub id: MatchId,
    pub round: i32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub status: MatchStatus,
    pub final_score: Option<Scoreline>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// What an administrator submits when recording a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultEntry {
    pub status: MatchStatus,
    pub score: Option<Scoreline>,
}

impl ResultEntry {
    #[must_use]
    pub const fn finished(score: Scoreline) -> Self {
        Self {
            status: MatchStatus::Finished,
            score: Some(score),
        }
    }
}

/// Outcome of a state transition: the new match plus what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub fixture: Match,
    pub previous_status: MatchStatus,
    pub events: Vec<DomainEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a finished result needs both home and away scores")]
    MissingScore,

    #[error("scores are only accepted when the match is finished")]
    UnexpectedScore,

    #[error("invalid score {0}: goals must be non-negative")]
    NegativeScore(Scoreline),

    #[error("status '{0}' cannot be set by a result entry")]
    InvalidTarget(MatchStatus),

    #[error("match {match_id} is {from} and cannot become {to}")]
    Illegal {
        match_id: MatchId,
        from: MatchStatus,
        to: MatchStatus,
    },
}

impl Match {
    /// Human readable fixture name, e.g. `Flamengo x Palmeiras`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} x {}", self.home_team, self.away_team)
    }

    #[must_use]
    pub fn has_kicked_off(&self, now: DateTime<Utc>) -> bool {
        self.kickoff <= now
    }

    #[must_use]
    pub fn accepts_predictions(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && !self.has_kicked_off(now)
    }

    /// Applies a result entry and reports the emitted events.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] when the entry is malformed or the
    /// transition is not part of the lifecycle.
    pub fn apply_result(&self, entry: ResultEntry) -> Result<Transition, TransitionError> {
        if let Some(score) = entry.score
            && (score.home < 0 || score.away < 0)
        {
            return Err(TransitionError::NegativeScore(score));
        }

        let mut next = self.clone();
        let mut events = Vec::new();

        match (self.status, entry.status) {
            (_, MatchStatus::Scheduled) => {
                return Err(TransitionError::InvalidTarget(MatchStatus::Scheduled));
            }
            (MatchStatus::Scheduled, MatchStatus::Finished) => {
                let score = entry.score.ok_or(TransitionError::MissingScore)?;
                next.status = MatchStatus::Finished;
                next.final_score = Some(score);
                events.push(DomainEvent::MatchFinalized {
                    match_id: self.id,
                    score,
                });
            }
            (MatchStatus::Finished, MatchStatus::Finished) => {
                next.final_score = Some(entry.score.ok_or(TransitionError::MissingScore)?);
            }
            (MatchStatus::Scheduled, to @ (MatchStatus::Postponed | MatchStatus::Canceled)) => {
                if entry.score.is_some() {
                    return Err(TransitionError::UnexpectedScore);
                }
                next.status = to;
                events.push(DomainEvent::MatchWithdrawn {
                    match_id: self.id,
                    status: to,
                });
            }
            (MatchStatus::Postponed, MatchStatus::Postponed)
            | (MatchStatus::Canceled, MatchStatus::Canceled) => {
                if entry.score.is_some() {
                    return Err(TransitionError::UnexpectedScore);
                }
            }
            (from, to) => {
                return Err(TransitionError::Illegal {
                    match_id: self.id,
                    from,
                    to,
                });
            }
        }

        Ok(Transition {
            fixture: next,
            previous_status: self.status,
            events,
        })
    }
}

/// Parses a stored or imported timestamp, always yielding UTC.
///
/// RFC 3339 strings keep their offset; naive timestamps are read as UTC.
///
/// # Errors
///
/// Returns the parse error of the last attempted format.
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => {
            const NAIVE_FORMATS: [&str; 4] = [
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M",
                "%Y-%m-%dT%H:%M",
            ];
            let mut last_err = rfc_err;
            for format in NAIVE_FORMATS {
                match NaiveDateTime::parse_from_str(raw, format) {
                    Ok(naive) => return Ok(naive.and_utc()),
                    Err(e) => last_err = e,
                }
            }
            Err(last_err)
        }
    }
}

/// Canonical storage form. Lexicographic order equals chronological order.
#[must_use]
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scheduled() -> Match {
        Match {
            id: MatchId::new(1),
            round: 5,
            home_team: "Bahia".to_string(),
            away_team: "Vitória".to_string(),
            kickoff: Utc.with_ymd_and_hms(2025, 5, 10, 19, 0, 0).unwrap(),
            status: MatchStatus::Scheduled,
            final_score: None,
            settled_at: None,
        }
    }

    #[test]
    fn finishing_emits_finalized_once() {
        let transition = scheduled()
            .apply_result(ResultEntry::finished(Scoreline::new(2, 1)))
            .unwrap();
        assert_eq!(transition.previous_status, MatchStatus::Scheduled);
        assert_eq!(transition.fixture.status, MatchStatus::Finished);
        assert_eq!(transition.fixture.final_score, Some(Scoreline::new(2, 1)));
        assert_eq!(
            transition.events,
            vec![DomainEvent::MatchFinalized {
                match_id: MatchId::new(1),
                score: Scoreline::new(2, 1),
            }]
        );

        let again = transition
            .fixture
            .apply_result(ResultEntry::finished(Scoreline::new(3, 1)))
            .unwrap();
        assert_eq!(again.previous_status, MatchStatus::Finished);
        assert_eq!(again.fixture.final_score, Some(Scoreline::new(3, 1)));
        assert!(again.events.is_empty());
    }

    #[test]
    fn finishing_requires_scores() {
        let entry = ResultEntry {
            status: MatchStatus::Finished,
            score: None,
        };
        assert_eq!(
            scheduled().apply_result(entry),
            Err(TransitionError::MissingScore)
        );
        assert_eq!(
            scheduled().apply_result(ResultEntry::finished(Scoreline::new(-1, 0))),
            Err(TransitionError::NegativeScore(Scoreline::new(-1, 0)))
        );
    }

    #[test]
    fn withdrawal_keeps_scores_absent() {
        let entry = ResultEntry {
            status: MatchStatus::Postponed,
            score: None,
        };
        let transition = scheduled().apply_result(entry).unwrap();
        assert_eq!(transition.fixture.status, MatchStatus::Postponed);
        assert_eq!(transition.fixture.final_score, None);
        assert!(matches!(
            transition.events.as_slice(),
            [DomainEvent::MatchWithdrawn {
                status: MatchStatus::Postponed,
                ..
            }]
        ));

        let with_score = ResultEntry {
            status: MatchStatus::Canceled,
            score: Some(Scoreline::new(0, 0)),
        };
        assert_eq!(
            scheduled().apply_result(with_score),
            Err(TransitionError::UnexpectedScore)
        );
    }

    #[test]
    fn terminal_states_do_not_move() {
        let postponed = scheduled()
            .apply_result(ResultEntry {
                status: MatchStatus::Postponed,
                score: None,
            })
            .unwrap()
            .fixture;

        let err = postponed
            .apply_result(ResultEntry::finished(Scoreline::new(1, 0)))
            .unwrap_err();
        assert!(matches!(err, TransitionError::Illegal { .. }));

        let finished = scheduled()
            .apply_result(ResultEntry::finished(Scoreline::new(1, 0)))
            .unwrap()
            .fixture;
        let err = finished
            .apply_result(ResultEntry {
                status: MatchStatus::Canceled,
                score: None,
            })
            .unwrap_err();
        assert!(matches!(err, TransitionError::Illegal { .. }));

        assert_eq!(
            scheduled().apply_result(ResultEntry {
                status: MatchStatus::Scheduled,
                score: None,
            }),
            Err(TransitionError::InvalidTarget(MatchStatus::Scheduled))
        );
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let expected = Utc.with_ymd_and_hms(2025, 5, 10, 19, 0, 0).unwrap();
        assert_eq!(parse_utc("2025-05-10 19:00:00").unwrap(), expected);
        assert_eq!(parse_utc("2025-05-10T19:00:00").unwrap(), expected);
        assert_eq!(parse_utc("2025-05-10T19:00:00Z").unwrap(), expected);
        assert_eq!(parse_utc("2025-05-10T16:00:00-03:00").unwrap(), expected);
        assert!(parse_utc("10/05/2025").is_err());
        assert_eq!(format_utc(expected), "2025-05-10T19:00:00Z");
    }

    #[test]
    fn kickoff_boundary_closes_predictions() {
        let fixture = scheduled();
        assert!(fixture.accepts_predictions(fixture.kickoff - chrono::Duration::seconds(1)));
        assert!(!fixture.accepts_predictions(fixture.kickoff));
    }
}
