//! HTTP API handlers for tsf-query

pub mod favorites;
pub mod health;
pub mod quiz;
pub mod results;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::error::ApiError;

pub use favorites::{add_favorite, list_favorites, reconcile, remove_favorite};
pub use health::health_routes;
pub use quiz::{bulk_programmes, filter, get_programme, get_questions};
pub use results::{get_results, save_results};

/// JSON body extractor whose rejections use the API error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}
