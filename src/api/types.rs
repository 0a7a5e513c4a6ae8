use serde::Serialize;

use crate::db::PredictionWithMatch;
use crate::domain::fixture::format_utc;
use crate::domain::{Match, MatchId, MatchStatus, Prediction};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MatchDto {
    pub id: MatchId,
    pub round: i32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: String,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub settled_at: Option<String>,
}

impl From<Match> for MatchDto {
    fn from(m: Match) -> Self {
        Self {
            id: m.id,
            round: m.round,
            home_team: m.home_team,
            away_team: m.away_team,
            kickoff: format_utc(m.kickoff),
            status: m.status,
            home_score: m.final_score.map(|s| s.home),
            away_score: m.final_score.map(|s| s.away),
            settled_at: m.settled_at.map(format_utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BetDto {
    pub id: i32,
    pub match_id: MatchId,
    pub home_score_bet: i32,
    pub away_score_bet: i32,
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<MatchDto>,
}

impl From<Prediction> for BetDto {
    fn from(p: Prediction) -> Self {
        Self {
            id: p.id,
            match_id: p.match_id,
            home_score_bet: p.predicted.home,
            away_score_bet: p.predicted.away,
            is_correct: p.is_correct,
            points_awarded: p.points_awarded,
            created_at: format_utc(p.created_at),
            fixture: None,
        }
    }
}

impl From<PredictionWithMatch> for BetDto {
    fn from(row: PredictionWithMatch) -> Self {
        Self {
            fixture: Some(MatchDto::from(row.fixture)),
            ..Self::from(row.prediction)
        }
    }
}
