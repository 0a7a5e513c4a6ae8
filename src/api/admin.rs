//! Administrator endpoints: fixtures, results, bulk CSV exchange and accounts.
//!
//! Every route here sits behind [`super::auth::require_admin`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MatchDto};
use crate::api::validation::{validate_csv_body, validate_match_id, validate_round, validate_user_id};
use crate::db::NewMatch;
use crate::domain::fixture::parse_utc;
use crate::domain::{MatchStatus, ResultEntry, Scoreline, UserRole};
use crate::services::{
    FixtureImportSummary, ResultImportSummary, SettlementSummary, UserInfo,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub round: i32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultRequest {
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    /// Defaults to `finished`.
    pub status: Option<String>,
}

impl RecordResultRequest {
    fn into_entry(self) -> Result<ResultEntry, ApiError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => MatchStatus::Finished,
            Some(raw) => raw
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| ApiError::validation(format!("Unknown match status '{raw}'")))?,
        };

        let score = match (self.home_score, self.away_score) {
            (None, None) => None,
            (Some(home), Some(away)) => Some(Scoreline::new(home, away)),
            _ => {
                return Err(ApiError::validation(
                    "Home and away scores must be given together",
                ));
            }
        };

        Ok(ResultEntry { status, score })
    }
}

#[derive(Debug, Serialize)]
pub struct RecordResultResponse {
    #[serde(rename = "match")]
    pub fixture: MatchDto,
    pub settlement: Option<SettlementSummary>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct ImportMatchesQuery {
    pub round: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

// ============================================================================
// Matches
// ============================================================================

/// GET /admin/matches
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<MatchDto>>>, ApiError> {
    let matches = state.shared.match_service.list_all().await?;
    Ok(Json(ApiResponse::success(
        matches.into_iter().map(MatchDto::from).collect(),
    )))
}

/// POST /admin/matches
pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kickoff = parse_utc(&payload.kickoff).map_err(|_| {
        ApiError::validation(format!("Invalid kickoff timestamp '{}'", payload.kickoff))
    })?;

    let created = state
        .shared
        .match_service
        .create_match(NewMatch {
            round: payload.round,
            home_team: payload.home_team,
            away_team: payload.away_team,
            kickoff,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MatchDto::from(created))),
    ))
}

/// PUT /admin/matches/{id}/result
pub async fn record_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<RecordResultRequest>,
) -> Result<Json<ApiResponse<RecordResultResponse>>, ApiError> {
    let id = validate_match_id(id)?;
    let entry = payload.into_entry()?;

    let recorded = state.shared.match_service.record_result(id, entry).await?;

    Ok(Json(ApiResponse::success(RecordResultResponse {
        fixture: MatchDto::from(recorded.fixture),
        settlement: recorded.settlement,
    })))
}

/// POST /admin/matches/{id}/settle
///
/// Recomputes points of a finished match after a score correction.
pub async fn resettle_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SettlementSummary>>, ApiError> {
    let id = validate_match_id(id)?;
    let summary = state.shared.match_service.resettle(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// DELETE /admin/matches/{id}
pub async fn delete_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_match_id(id)?;
    state.shared.match_service.delete_match(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /admin/rounds/{n}
pub async fn delete_round(
    State(state): State<Arc<AppState>>,
    Path(round): Path<i32>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ApiError> {
    let round = validate_round(round)?;
    let deleted = state.shared.match_service.delete_round(round).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { deleted })))
}

// ============================================================================
// CSV exchange
// ============================================================================

/// POST /admin/import/matches?round=n
pub async fn import_matches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportMatchesQuery>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let round = validate_round(query.round)?;
    let csv = validate_csv_body(&body)?;

    let summary: FixtureImportSummary = state
        .shared
        .import_service
        .import_fixtures(round, csv)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(summary))))
}

/// GET /admin/export/results/{n}
pub async fn export_results(
    State(state): State<Arc<AppState>>,
    Path(round): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let round = validate_round(round)?;
    let csv = state
        .shared
        .import_service
        .export_results_template(round)
        .await?;

    let filename = format!("results-round-{round}.csv");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}

/// POST /admin/import/results
pub async fn import_results(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ApiResponse<ResultImportSummary>>, ApiError> {
    let csv = validate_csv_body(&body)?;
    let summary = state.shared.import_service.import_results(csv).await?;
    Ok(Json(ApiResponse::success(summary)))
}

// ============================================================================
// Users
// ============================================================================

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let users = state.shared.auth_service.list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// POST /admin/users
///
/// Unlike public registration this may create administrators.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .shared
        .auth_service
        .register(&payload.username, &payload.password, payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// PUT /admin/users/{id}/active
pub async fn set_user_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let id = validate_user_id(id)?;
    let user = state
        .shared
        .auth_service
        .set_active(id, payload.is_active)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(home: Option<i32>, away: Option<i32>, status: Option<&str>) -> RecordResultRequest {
        RecordResultRequest {
            home_score: home,
            away_score: away,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn status_defaults_to_finished() {
        let entry = request(Some(2), Some(1), None).into_entry().unwrap();
        assert_eq!(entry, ResultEntry::finished(Scoreline::new(2, 1)));
    }

    #[test]
    fn status_is_case_insensitive() {
        let entry = request(None, None, Some("POSTPONED")).into_entry().unwrap();
        assert_eq!(entry.status, MatchStatus::Postponed);
        assert_eq!(entry.score, None);

        assert!(request(None, None, Some("abandoned")).into_entry().is_err());
    }

    #[test]
    fn half_a_score_is_rejected() {
        assert!(request(Some(1), None, None).into_entry().is_err());
    }

    #[test]
    fn set_active_takes_camel_case() {
        let req: SetActiveRequest = serde_json::from_str(r#"{"isActive": false}"#).unwrap();
        assert!(!req.is_active);
        assert!(serde_json::from_str::<SetActiveRequest>(r#"{"is_active": false}"#).is_err());
    }
}
