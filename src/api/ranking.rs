use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::Standing;

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<u64>,
}

/// GET /ranking
///
/// Public leaderboard.
pub async fn get_ranking(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<ApiResponse<Vec<Standing>>>, ApiError> {
    let standings = state.shared.ranking_service.ranking(query.limit).await?;
    Ok(Json(ApiResponse::success(standings)))
}
