//! tsf-query library - quiz filter and account service
//!
//! Stateless HTTP reader over the committed catalog: Level-1 and Level-2
//! candidate filtering, programme lookups, the question bank, favorites,
//! guest result reconciliation and stored quiz results.

use axum::Router;
use sqlx::SqlitePool;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tsf_common::config::ServerConfig;

pub mod api;
pub mod db;
pub mod error;
pub mod matching;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: ServerConfig,
    pub startup_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: ServerConfig) -> Self {
        Self {
            db,
            config,
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    let quiz = Router::new()
        .route("/api/quiz/filter", post(api::filter))
        .route("/api/quiz/level/:level", get(api::get_questions))
        .route("/api/quiz/study-programme/:id", get(api::get_programme))
        .route("/api/quiz/study-programmes/bulk", post(api::bulk_programmes));

    let accounts = Router::new()
        .route(
            "/api/accounts/:account/favorites",
            get(api::list_favorites).post(api::add_favorite),
        )
        .route(
            "/api/accounts/:account/favorites/:programme",
            delete(api::remove_favorite),
        )
        .route("/api/accounts/:account/reconcile", post(api::reconcile))
        .route(
            "/api/accounts/:account/results",
            get(api::get_results).put(api::save_results),
        );

    Router::new()
        .merge(quiz)
        .merge(accounts)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
