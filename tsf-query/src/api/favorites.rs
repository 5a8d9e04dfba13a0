//! Favorites and guest result reconciliation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tsf_common::api::{FavoriteRequest, FavoritesResponse, ReconcileReport, ReconcileRequest};

use super::ApiJson;
use crate::db::favorites::{self, AddOutcome};
use crate::db::programmes::programme_exists;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub success: bool,
    pub study_programme_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ReconcileReport,
}

/// GET /api/accounts/:account/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> ApiResult<Json<FavoritesResponse>> {
    Ok(Json(FavoritesResponse {
        success: true,
        favorites: favorites::list(&state.db, account_id).await?,
    }))
}

/// POST /api/accounts/:account/favorites
pub async fn add_favorite(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    ApiJson(request): ApiJson<FavoriteRequest>,
) -> ApiResult<(StatusCode, Json<FavoriteResponse>)> {
    let programme_id = request.study_programme_id;
    if !programme_exists(&state.db, programme_id).await? {
        return Err(ApiError::NotFound(format!("Study programme {}", programme_id)));
    }

    match favorites::add(&state.db, account_id, programme_id).await? {
        AddOutcome::Added => Ok((
            StatusCode::CREATED,
            Json(FavoriteResponse {
                success: true,
                study_programme_id: programme_id,
            }),
        )),
        AddOutcome::AlreadyPresent => Err(ApiError::Conflict(format!(
            "Study programme {} is already a favorite",
            programme_id
        ))),
    }
}

/// DELETE /api/accounts/:account/favorites/:programme
pub async fn remove_favorite(
    State(state): State<AppState>,
    Path((account_id, programme_id)): Path<(i64, i64)>,
) -> ApiResult<Json<FavoriteResponse>> {
    if !favorites::remove(&state.db, account_id, programme_id).await? {
        return Err(ApiError::NotFound(format!(
            "Study programme {} is not a favorite",
            programme_id
        )));
    }

    Ok(Json(FavoriteResponse {
        success: true,
        study_programme_id: programme_id,
    }))
}

/// POST /api/accounts/:account/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    ApiJson(request): ApiJson<ReconcileRequest>,
) -> ApiResult<Json<ReconcileResponse>> {
    if request.result_ids.is_empty() {
        return Err(ApiError::BadRequest("resultIds cannot be empty".to_string()));
    }

    let report = favorites::reconcile(&state.db, account_id, &request.result_ids).await;
    Ok(Json(ReconcileResponse {
        success: true,
        report,
    }))
}
