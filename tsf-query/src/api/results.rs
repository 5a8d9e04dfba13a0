//! Stored quiz result endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use tsf_common::api::{QuizResultsRequest, QuizResultsResponse};

use super::ApiJson;
use crate::db::results;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// PUT /api/accounts/:account/results
pub async fn save_results(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    ApiJson(request): ApiJson<QuizResultsRequest>,
) -> ApiResult<Json<QuizResultsResponse>> {
    if request.result_ids.is_empty() {
        return Err(ApiError::BadRequest("resultIds cannot be empty".to_string()));
    }

    let stored = results::save(&state.db, account_id, &request.result_ids).await?;
    info!(account_id, results = stored.result_ids.len(), "Quiz results saved");

    Ok(Json(QuizResultsResponse {
        success: true,
        result_ids: stored.result_ids,
        updated_at: stored.updated_at,
    }))
}

/// GET /api/accounts/:account/results
pub async fn get_results(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> ApiResult<Json<QuizResultsResponse>> {
    let stored = results::get(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No quiz results found".to_string()))?;

    Ok(Json(QuizResultsResponse {
        success: true,
        result_ids: stored.result_ids,
        updated_at: stored.updated_at,
    }))
}
