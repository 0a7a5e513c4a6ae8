//! Settlement arithmetic.
//!
//! Scoring policy: an exact scoreline earns [`EXACT_SCORE_POINTS`], anything
//! else earns nothing. There is no partial credit for outcome or goal
//! difference.
//!
//! The plan is computed in memory and applied by the store as one batch. Each
//! user's delta is `new - previously awarded`, so applying a plan to a match
//! that is already settled against the same score is a no-op.

use std::collections::BTreeMap;

use super::{MatchId, Prediction, Scoreline, UserId};

pub const EXACT_SCORE_POINTS: i32 = 1;

/// The settled state of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub prediction_id: i32,
    pub user_id: UserId,
    pub is_correct: bool,
    pub points_awarded: i32,
    pub previous_points: i32,
}

impl Award {
    #[must_use]
    pub const fn delta(&self) -> i32 {
        self.points_awarded - self.previous_points
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub match_id: MatchId,
    pub score: Scoreline,
    pub awards: Vec<Award>,
    /// Non-zero point changes per user, in user id order.
    pub user_deltas: BTreeMap<UserId, i32>,
}

impl SettlementPlan {
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.awards.iter().filter(|a| a.is_correct).count()
    }

    #[must_use]
    pub fn total_awarded(&self) -> i32 {
        self.awards.iter().map(|a| a.points_awarded).sum()
    }

    #[must_use]
    pub fn net_change(&self) -> i32 {
        self.user_deltas.values().sum()
    }
}

#[must_use]
pub const fn points_for(predicted: Scoreline, actual: Scoreline) -> i32 {
    if predicted.home == actual.home && predicted.away == actual.away {
        EXACT_SCORE_POINTS
    } else {
        0
    }
}

/// Computes the settlement of every prediction tied to `match_id`.
#[must_use]
pub fn plan_settlement(
    match_id: MatchId,
    score: Scoreline,
    predictions: &[Prediction],
) -> SettlementPlan {
    let mut user_deltas: BTreeMap<UserId, i32> = BTreeMap::new();

    let awards: Vec<Award> = predictions
        .iter()
        .filter(|p| p.match_id == match_id)
        .map(|p| {
            let points_awarded = points_for(p.predicted, score);
            Award {
                prediction_id: p.id,
                user_id: p.user_id,
                is_correct: points_awarded > 0,
                points_awarded,
                previous_points: p.points_awarded,
            }
        })
        .collect();

    for award in &awards {
        let delta = award.delta();
        if delta != 0 {
            *user_deltas.entry(award.user_id).or_default() += delta;
        }
    }
    user_deltas.retain(|_, delta| *delta != 0);

    SettlementPlan {
        match_id,
        score,
        awards,
        user_deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn prediction(id: i32, user: i32, home: i32, away: i32) -> Prediction {
        Prediction {
            id,
            user_id: UserId::new(user),
            match_id: MatchId::new(10),
            predicted: Scoreline::new(home, away),
            is_correct: None,
            points_awarded: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exact_score_only() {
        let actual = Scoreline::new(2, 1);
        assert_eq!(points_for(Scoreline::new(2, 1), actual), 1);
        assert_eq!(points_for(Scoreline::new(2, 2), actual), 0);
        assert_eq!(points_for(Scoreline::new(1, 2), actual), 0);
        assert_eq!(points_for(Scoreline::new(3, 2), actual), 0);
    }

    #[test]
    fn scenario_two_correct_one_wrong() {
        let predictions = vec![
            prediction(1, 1, 2, 1),
            prediction(2, 2, 2, 1),
            prediction(3, 3, 0, 0),
        ];
        let plan = plan_settlement(MatchId::new(10), Scoreline::new(2, 1), &predictions);

        assert_eq!(plan.awards.len(), 3);
        assert_eq!(plan.correct_count(), 2);
        assert_eq!(plan.total_awarded(), 2);
        assert_eq!(plan.net_change(), plan.total_awarded());
        assert_eq!(plan.user_deltas.get(&UserId::new(1)), Some(&1));
        assert_eq!(plan.user_deltas.get(&UserId::new(2)), Some(&1));
        assert_eq!(plan.user_deltas.get(&UserId::new(3)), None);
        assert!(!plan.awards[2].is_correct);
    }

    #[test]
    fn replanning_against_same_score_changes_nothing() {
        let mut settled = prediction(1, 1, 2, 1);
        settled.is_correct = Some(true);
        settled.points_awarded = 1;

        let plan = plan_settlement(MatchId::new(10), Scoreline::new(2, 1), &[settled]);
        assert!(plan.user_deltas.is_empty());
        assert_eq!(plan.total_awarded(), 1);
    }

    #[test]
    fn corrected_score_moves_points() {
        let mut was_right = prediction(1, 1, 2, 1);
        was_right.is_correct = Some(true);
        was_right.points_awarded = 1;
        let mut was_wrong = prediction(2, 2, 3, 1);
        was_wrong.is_correct = Some(false);

        let plan = plan_settlement(
            MatchId::new(10),
            Scoreline::new(3, 1),
            &[was_right, was_wrong],
        );
        assert_eq!(plan.user_deltas.get(&UserId::new(1)), Some(&-1));
        assert_eq!(plan.user_deltas.get(&UserId::new(2)), Some(&1));
        assert_eq!(plan.net_change(), 0);
    }

    #[test]
    fn ignores_predictions_of_other_matches() {
        let mut other = prediction(1, 1, 2, 1);
        other.match_id = MatchId::new(11);
        let plan = plan_settlement(MatchId::new(10), Scoreline::new(2, 1), &[other]);
        assert!(plan.awards.is_empty());
    }
}
