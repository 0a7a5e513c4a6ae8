use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MatchId, Scoreline, UserId};

/// One user's guess for one match. `is_correct` stays `None` until settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub id: i32,
    pub user_id: UserId,
    pub match_id: MatchId,
    pub predicted: Scoreline,
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
