use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MatchDto};
use crate::api::validation::validate_round;

/// GET /matches
///
/// Every match that is not canceled, ordered by round then kickoff.
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<MatchDto>>>, ApiError> {
    let matches = state.shared.match_service.list_visible().await?;
    Ok(Json(ApiResponse::success(
        matches.into_iter().map(MatchDto::from).collect(),
    )))
}

/// GET /matches/round/{n}
pub async fn list_round(
    State(state): State<Arc<AppState>>,
    Path(round): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MatchDto>>>, ApiError> {
    let round = validate_round(round)?;
    let matches = state.shared.match_service.list_by_round(round).await?;
    Ok(Json(ApiResponse::success(
        matches.into_iter().map(MatchDto::from).collect(),
    )))
}
