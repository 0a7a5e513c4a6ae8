//! Prediction endpoints. Every handler acts on the calling user's own bets.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, BetDto};
use crate::api::validation::{validate_match_id, validate_round};
use crate::domain::{BatchItem, Scoreline};
use crate::services::Principal;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    pub match_id: i32,
    pub home_score_bet: i32,
    pub away_score_bet: i32,
}

/// Accepts either a single bet or a list of bets.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SubmitBetsRequest {
    Batch(Vec<BetRequest>),
    Single(BetRequest),
}

impl SubmitBetsRequest {
    fn into_items(self) -> Result<Vec<BatchItem>, ApiError> {
        let bets = match self {
            Self::Batch(bets) => bets,
            Self::Single(bet) => vec![bet],
        };
        bets.into_iter()
            .map(|bet| {
                Ok(BatchItem {
                    match_id: validate_match_id(bet.match_id)?,
                    score: Scoreline::new(bet.home_score_bet, bet.away_score_bet),
                })
            })
            .collect()
    }
}

/// POST /bets
///
/// All bets in the body are stored together or not at all.
pub async fn submit_bets(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<SubmitBetsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let items = payload.into_items()?;
    let created = state
        .shared
        .prediction_service
        .submit_batch(principal.user_id, items)
        .await?;

    let bets: Vec<BetDto> = created.into_iter().map(BetDto::from).collect();
    Ok((StatusCode::CREATED, Json(ApiResponse::success(bets))))
}

/// GET /bets
pub async fn list_bets(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<BetDto>>>, ApiError> {
    let rows = state
        .shared
        .prediction_service
        .list_by_user(principal.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(BetDto::from).collect(),
    )))
}

/// GET /bets/round/{n}
pub async fn list_round_bets(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(round): Path<i32>,
) -> Result<Json<ApiResponse<Vec<BetDto>>>, ApiError> {
    let round = validate_round(round)?;
    let rows = state
        .shared
        .prediction_service
        .list_by_user_and_round(principal.user_id, round)
        .await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(BetDto::from).collect(),
    )))
}

/// GET /bets/match/{id}
pub async fn get_match_bet(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<BetDto>>, ApiError> {
    let match_id = validate_match_id(id)?;
    let prediction = state
        .shared
        .prediction_service
        .get_for_user_and_match(principal.user_id, match_id)
        .await?;
    Ok(Json(ApiResponse::success(BetDto::from(prediction))))
}
