//! Decides whether a prediction may be admitted.
//!
//! Checks run in a fixed order so the reported error is always the most
//! fundamental one: every referenced match must exist before any per-match
//! rule is looked at, and kickoff/status beat duplicate detection.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::{Match, MatchId, Scoreline};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("cannot predict match '{fixture}' (ID: {match_id}): it has already started or finished")]
    AlreadyStarted { match_id: MatchId, fixture: String },

    #[error("a prediction for match '{fixture}' (ID: {match_id}) already exists")]
    AlreadyPredicted { match_id: MatchId, fixture: String },
}

impl Ineligible {
    #[must_use]
    pub const fn match_id(&self) -> MatchId {
        match self {
            Self::MatchNotFound(id) => *id,
            Self::AlreadyStarted { match_id, .. } | Self::AlreadyPredicted { match_id, .. } => {
                *match_id
            }
        }
    }
}

/// A single entry of a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchItem {
    pub match_id: MatchId,
    pub score: Scoreline,
}

/// Pre-flight pass over a whole batch. Any failure rejects the batch.
///
/// `fixtures` holds the matches found for the batch ids, `predicted` the ids
/// the user already has a prediction for.
///
/// # Errors
///
/// Returns the first offending item's reason.
pub fn check_batch(
    now: DateTime<Utc>,
    items: &[BatchItem],
    fixtures: &HashMap<MatchId, Match>,
    predicted: &HashSet<MatchId>,
) -> Result<(), Ineligible> {
    if let Some(missing) = items.iter().find(|i| !fixtures.contains_key(&i.match_id)) {
        return Err(Ineligible::MatchNotFound(missing.match_id));
    }

    items.iter().try_for_each(|item| {
        check_pair(
            now,
            item.match_id,
            fixtures.get(&item.match_id),
            predicted.contains(&item.match_id),
        )
    })
}

fn check_pair(
    now: DateTime<Utc>,
    match_id: MatchId,
    fixture: Option<&Match>,
    already_predicted: bool,
) -> Result<(), Ineligible> {
    let fixture = fixture.ok_or(Ineligible::MatchNotFound(match_id))?;

    if !fixture.accepts_predictions(now) {
        return Err(Ineligible::AlreadyStarted {
            match_id,
            fixture: fixture.label(),
        });
    }

    if already_predicted {
        return Err(Ineligible::AlreadyPredicted {
            match_id,
            fixture: fixture.label(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    fn fixture(id: i32, kickoff_in_hours: i64, status: MatchStatus) -> Match {
        Match {
            id: MatchId::new(id),
            round: 1,
            home_team: format!("Home {id}"),
            away_team: format!("Away {id}"),
            kickoff: now() + Duration::hours(kickoff_in_hours),
            status,
            final_score: None,
            settled_at: None,
        }
    }

    /// Runs a one-item batch against `fixture`, optionally already predicted.
    fn check(id: i32, fixture: Option<&Match>, predicted: bool) -> Result<(), Ineligible> {
        let match_id = MatchId::new(id);
        let fixtures: HashMap<MatchId, Match> =
            fixture.map(|f| (f.id, f.clone())).into_iter().collect();
        let predicted: HashSet<MatchId> = predicted.then_some(match_id).into_iter().collect();
        let items = [BatchItem {
            match_id,
            score: Scoreline::new(1, 0),
        }];
        check_batch(now(), &items, &fixtures, &predicted)
    }

    #[test]
    fn admits_future_scheduled_match() {
        let f = fixture(1, 2, MatchStatus::Scheduled);
        assert_eq!(check(1, Some(&f), false), Ok(()));
    }

    #[test]
    fn rejects_missing_match() {
        assert_eq!(
            check(4, None, false),
            Err(Ineligible::MatchNotFound(MatchId::new(4)))
        );
    }

    #[test]
    fn rejects_at_or_after_kickoff() {
        let at_kickoff = fixture(1, 0, MatchStatus::Scheduled);
        assert!(matches!(
            check(1, Some(&at_kickoff), false),
            Err(Ineligible::AlreadyStarted { .. })
        ));

        let past = fixture(2, -1, MatchStatus::Scheduled);
        assert!(matches!(
            check(2, Some(&past), false),
            Err(Ineligible::AlreadyStarted { .. })
        ));
    }

    #[test]
    fn rejects_non_scheduled_even_before_kickoff() {
        for status in [
            MatchStatus::Finished,
            MatchStatus::Postponed,
            MatchStatus::Canceled,
        ] {
            let f = fixture(1, 5, status);
            assert!(matches!(
                check(1, Some(&f), false),
                Err(Ineligible::AlreadyStarted { .. })
            ));
        }
    }

    #[test]
    fn started_wins_over_duplicate() {
        let f = fixture(1, -1, MatchStatus::Scheduled);
        assert!(matches!(
            check(1, Some(&f), true),
            Err(Ineligible::AlreadyStarted { .. })
        ));

        let open = fixture(2, 1, MatchStatus::Scheduled);
        assert!(matches!(
            check(2, Some(&open), true),
            Err(Ineligible::AlreadyPredicted { .. })
        ));
    }

    #[test]
    fn batch_reports_missing_before_anything_else() {
        let started = fixture(1, -1, MatchStatus::Scheduled);
        let fixtures = HashMap::from([(started.id, started)]);
        let items = [
            BatchItem {
                match_id: MatchId::new(1),
                score: Scoreline::new(0, 0),
            },
            BatchItem {
                match_id: MatchId::new(9),
                score: Scoreline::new(0, 0),
            },
        ];

        assert_eq!(
            check_batch(now(), &items, &fixtures, &HashSet::new()),
            Err(Ineligible::MatchNotFound(MatchId::new(9)))
        );
    }

    #[test]
    fn batch_names_the_offending_match() {
        let open = fixture(1, 3, MatchStatus::Scheduled);
        let also_open = fixture(2, 3, MatchStatus::Scheduled);
        let fixtures = HashMap::from([(open.id, open), (also_open.id, also_open)]);
        let items = [
            BatchItem {
                match_id: MatchId::new(1),
                score: Scoreline::new(2, 1),
            },
            BatchItem {
                match_id: MatchId::new(2),
                score: Scoreline::new(0, 0),
            },
        ];

        assert_eq!(
            check_batch(now(), &items, &fixtures, &HashSet::new()),
            Ok(())
        );

        let err = check_batch(now(), &items, &fixtures, &HashSet::from([MatchId::new(2)]))
            .unwrap_err();
        assert_eq!(err.match_id(), MatchId::new(2));
        assert!(matches!(err, Ineligible::AlreadyPredicted { .. }));
    }
}
