//! Integration tests for tsf-query API endpoints
//!
//! Each test seeds a throwaway database through the tsf-ingest refresh
//! pipeline with the shared catalog fixtures, then drives the router
//! in-process.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use tsf_common::config::ServerConfig;
use tsf_common::db::init_database;
use tsf_ingest::{run_refresh, RefreshInputs, RefreshOptions};
use tsf_query::{build_router, AppState};

fn fixture(name: &str) -> Vec<u8> {
    let path: PathBuf = [
        env!("CARGO_MANIFEST_DIR"),
        "..",
        "tsf-ingest",
        "tests",
        "fixtures",
        name,
    ]
    .iter()
    .collect();
    std::fs::read(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

/// Test helper: database holding the fixture catalog
async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("test_tsf.db")).await.unwrap();

    let inputs = RefreshInputs {
        institutions: fixture("institutions.xml"),
        programmes: fixture("degreeprogrammes.xml"),
        area_overlay: fixture("area_overlay.csv"),
        field_overlay: fixture("field_overlay.csv"),
        questions: Some(fixture("questions.csv")),
    };
    run_refresh(&pool, &inputs, &RefreshOptions::default())
        .await
        .expect("fixture refresh should commit");

    (dir, pool)
}

fn setup_app_with(db: SqlitePool, config: ServerConfig) -> Router {
    build_router(AppState::new(db, config))
}

fn setup_app(db: SqlitePool) -> Router {
    setup_app_with(db, ServerConfig::default())
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn filter_ids(app: &Router, body: Value) -> Vec<i64> {
    let (status, json) = send(app, json_request("POST", "/api/quiz/filter", body)).await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["success"], true);
    serde_json::from_value(json["ids"].clone()).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(&app, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tsf-query");
    assert!(body["version"].is_string());
    assert!(body["uptimeSeconds"].is_u64());
}

// =============================================================================
// Level 1
// =============================================================================

#[tokio::test]
async fn test_level1_filters_by_programme_type() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let undergraduate = filter_ids(
        &app,
        json!({"level": 1, "answers": [{"studientyp": "grundständig"}]}),
    )
    .await;
    assert_eq!(undergraduate, vec![100, 101]);

    let graduate = filter_ids(
        &app,
        json!({"level": 1, "answers": [{"studientyp": "weiterführend"}]}),
    )
    .await;
    assert_eq!(graduate, vec![102, 103]);
}

#[tokio::test]
async fn test_level1_without_preference_returns_everything() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let all = vec![100, 101, 102, 103];
    assert_eq!(filter_ids(&app, json!({"level": 1, "answers": []})).await, all);
    assert_eq!(filter_ids(&app, json!({"level": 1})).await, all);
    assert_eq!(
        filter_ids(&app, json!({"level": 1, "answers": [{"studientyp": "all"}]})).await,
        all
    );
}

#[tokio::test]
async fn test_level1_unknown_type_is_empty() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let ids = filter_ids(&app, json!({"level": 1, "answers": [{"studientyp": "promotion"}]})).await;
    assert!(ids.is_empty());
}

// =============================================================================
// Level 2
// =============================================================================

#[tokio::test]
async fn test_level2_orders_by_shared_traits_then_id() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    // 100 and 102 lead with I and C, 101 with R and E, 103 has no vector
    let ids = filter_ids(
        &app,
        json!({
            "level": 2,
            "answers": [
                {"type": "I", "score": 5},
                {"type": "C", "score": 4},
                {"type": "R", "score": 3}
            ],
            "studyProgrammeIds": [103, 102, 101, 100]
        }),
    )
    .await;
    assert_eq!(ids, vec![100, 102, 101]);

    let ids = filter_ids(
        &app,
        json!({
            "level": 2,
            "answers": [
                {"type": "E", "score": 2},
                {"type": "S", "score": 1},
                {"type": "A", "score": 0}
            ],
            "studyProgrammeIds": [100, 101, 102, 103]
        }),
    )
    .await;
    assert_eq!(ids, vec![101]);
}

#[tokio::test]
async fn test_level2_only_considers_candidates() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let ids = filter_ids(
        &app,
        json!({
            "level": 2,
            "answers": [
                {"type": "I", "score": 3},
                {"type": "R", "score": 2},
                {"type": "E", "score": 1}
            ],
            "studyProgrammeIds": [101, 102]
        }),
    )
    .await;
    assert_eq!(ids, vec![101, 102]);
}

#[tokio::test]
async fn test_level2_empty_inputs_are_not_errors() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let no_candidates = filter_ids(
        &app,
        json!({"level": 2, "answers": [{"type": "I", "score": 3}], "studyProgrammeIds": []}),
    )
    .await;
    assert!(no_candidates.is_empty());

    let no_traits = filter_ids(
        &app,
        json!({"level": 2, "answers": [], "studyProgrammeIds": [100, 101]}),
    )
    .await;
    assert!(no_traits.is_empty());

    let no_match = filter_ids(
        &app,
        json!({"level": 2, "answers": [{"type": "A", "score": 3}], "studyProgrammeIds": [100, 101, 102]}),
    )
    .await;
    assert!(no_match.is_empty());
}

#[tokio::test]
async fn test_level2_result_limit() {
    let (_dir, db) = setup_test_db().await;
    let config = ServerConfig {
        level2_result_limit: 1,
        ..ServerConfig::default()
    };
    let app = setup_app_with(db, config);

    let ids = filter_ids(
        &app,
        json!({
            "level": 2,
            "answers": [{"type": "I", "score": 5}, {"type": "R", "score": 4}],
            "studyProgrammeIds": [100, 101, 102]
        }),
    )
    .await;
    assert_eq!(ids, vec![100]);
}

#[tokio::test]
async fn test_unsupported_level_and_bad_body() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/quiz/filter", json!({"level": 3, "answers": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/api/quiz/filter")
        .header("content-type", "application/json")
        .body(Body::from("{\"level\":"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Questions and programmes
// =============================================================================

#[tokio::test]
async fn test_level2_questions() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(&app, test_request("GET", "/api/quiz/level/2")).await;
    assert_eq!(status, StatusCode::OK);

    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 6);
    assert_eq!(questions[0]["id"], 1);
    assert_eq!(questions[0]["riasec_type"], "R");
    assert_eq!(questions[5]["riasec_type"], "C");

    let (status, _) = send(&app, test_request("GET", "/api/quiz/level/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, test_request("GET", "/api/quiz/level/two")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_programme_detail() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(&app, test_request("GET", "/api/quiz/study-programme/100")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let p = &body["studyProgramme"];
    assert_eq!(p["id"], 100);
    assert_eq!(p["name"], "Informatik");
    assert_eq!(p["programmeType"], "grundständig");
    assert_eq!(p["institutionName"], "Technische Universität Berlin");
    assert_eq!(p["degreeName"], "Bachelor of Science");
    assert_eq!(p["accredited"], true);
    assert_eq!(p["deadlines"].as_array().unwrap().len(), 1);
    assert_eq!(p["fieldsOfStudy"], json!([{"id": 20, "name": "Informatik"}]));
    assert_eq!(p["disciplines"][0]["id"], 501);
    assert_eq!(p["teachingLanguages"][0]["isMain"], true);
    assert_eq!(p["locations"][0]["name"], "Berlin");
}

#[tokio::test]
async fn test_programme_detail_reads_committed_catalog() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db.clone());

    // Refresh in progress: links removed but not committed
    let mut tx = db.begin().await.unwrap();
    sqlx::query("DELETE FROM programme_fields")
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query("DELETE FROM programme_locations")
        .execute(&mut *tx)
        .await
        .unwrap();

    let (status, body) = send(&app, test_request("GET", "/api/quiz/study-programme/100")).await;
    assert_eq!(status, StatusCode::OK);
    let p = &body["studyProgramme"];
    assert_eq!(p["fieldsOfStudy"], json!([{"id": 20, "name": "Informatik"}]));
    assert_eq!(p["locations"][0]["name"], "Berlin");

    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn test_missing_programme_is_null_not_error() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(&app, test_request("GET", "/api/quiz/study-programme/999")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["studyProgramme"].is_null());
}

#[tokio::test]
async fn test_bulk_programmes_keep_request_order() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/quiz/study-programmes/bulk",
            json!({"ids": [102, 999, 100]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let programmes = body["studyProgrammes"].as_array().unwrap();
    assert_eq!(programmes.len(), 2);
    assert_eq!(programmes[0]["id"], 102);
    assert_eq!(programmes[0]["degree"], "Master of Science");
    assert_eq!(programmes[1]["id"], 100);
    assert_eq!(programmes[1]["city"], "Berlin");
}

// =============================================================================
// Favorites
// =============================================================================

#[tokio::test]
async fn test_add_favorite_twice_conflicts() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);
    let add = || json_request("POST", "/api/accounts/7/favorites", json!({"studyProgrammeId": 100}));

    let (status, body) = send(&app, add()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["studyProgrammeId"], 100);

    let (status, body) = send(&app, add()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, body) = send(&app, test_request("GET", "/api/accounts/7/favorites")).await;
    assert_eq!(body["favorites"], json!([100]));
}

#[tokio::test]
async fn test_favorites_newest_first_and_per_account() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    for id in [100, 102, 101] {
        let (status, _) = send(
            &app,
            json_request("POST", "/api/accounts/7/favorites", json!({"studyProgrammeId": id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, test_request("GET", "/api/accounts/7/favorites")).await;
    assert_eq!(body["favorites"], json!([101, 102, 100]));

    let (_, body) = send(&app, test_request("GET", "/api/accounts/8/favorites")).await;
    assert_eq!(body["favorites"], json!([]));
}

#[tokio::test]
async fn test_favorite_for_unknown_programme() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/accounts/7/favorites", json!({"studyProgrammeId": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_absent_favorite_is_not_found() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    send(
        &app,
        json_request("POST", "/api/accounts/7/favorites", json!({"studyProgrammeId": 101})),
    )
    .await;

    let (status, _) = send(&app, test_request("DELETE", "/api/accounts/7/favorites/101")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, test_request("DELETE", "/api/accounts/7/favorites/101")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    send(
        &app,
        json_request("POST", "/api/accounts/7/favorites", json!({"studyProgrammeId": 100})),
    )
    .await;

    let reconcile = || {
        json_request(
            "POST",
            "/api/accounts/7/reconcile",
            json!({"resultIds": [100, 101, 999, 101]}),
        )
    };

    let (status, body) = send(&app, reconcile()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["attached"], json!([101]));
    assert_eq!(body["alreadyPresent"], json!([100]));
    assert_eq!(body["failed"], json!([999]));

    let (_, body) = send(&app, reconcile()).await;
    assert_eq!(body["attached"], json!([]));
    assert_eq!(body["alreadyPresent"], json!([100, 101]));

    let (_, body) = send(&app, test_request("GET", "/api/accounts/7/favorites")).await;
    assert_eq!(body["favorites"], json!([101, 100]));
}

#[tokio::test]
async fn test_reconcile_keeps_favorite_of_dropped_programme() {
    let (_dir, db) = setup_test_db().await;

    // Favorite left over from an earlier catalog that no longer has 555
    sqlx::query("INSERT INTO favorites (account_id, programme_id) VALUES (7, 555)")
        .execute(&db)
        .await
        .unwrap();

    let app = setup_app(db);
    let (status, body) = send(
        &app,
        json_request("POST", "/api/accounts/7/reconcile", json!({"resultIds": [555, 556]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attached"], json!([]));
    assert_eq!(body["alreadyPresent"], json!([555]));
    assert_eq!(body["failed"], json!([556]));

    let (_, body) = send(&app, test_request("GET", "/api/accounts/7/favorites")).await;
    assert_eq!(body["favorites"], json!([555]));
}

#[tokio::test]
async fn test_reconcile_requires_ids() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/accounts/7/reconcile", json!({"resultIds": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Stored results
// =============================================================================

#[tokio::test]
async fn test_quiz_results_roundtrip() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db);

    let (status, body) = send(&app, test_request("GET", "/api/accounts/7/results")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/accounts/7/results", json!({"resultIds": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request("PUT", "/api/accounts/7/results", json!({"resultIds": [102, 100]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resultIds"], json!([102, 100]));

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/accounts/7/results", json!({"resultIds": [101]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, test_request("GET", "/api/accounts/7/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resultIds"], json!([101]));
    assert!(body["updatedAt"].is_string());
}

#[tokio::test]
async fn test_catalog_refresh_keeps_serving_favorites() {
    let (_dir, db) = setup_test_db().await;
    let app = setup_app(db.clone());

    send(
        &app,
        json_request("POST", "/api/accounts/7/favorites", json!({"studyProgrammeId": 102})),
    )
    .await;

    let inputs = RefreshInputs {
        institutions: fixture("institutions.xml"),
        programmes: fixture("degreeprogrammes.xml"),
        area_overlay: fixture("area_overlay.csv"),
        field_overlay: fixture("field_overlay.csv"),
        questions: None,
    };
    run_refresh(&db, &inputs, &RefreshOptions::default()).await.unwrap();

    let (_, body) = send(&app, test_request("GET", "/api/accounts/7/favorites")).await;
    assert_eq!(body["favorites"], json!([102]));

    let ids = filter_ids(&app, json!({"level": 1, "answers": []})).await;
    assert_eq!(ids.len(), 4);
}
