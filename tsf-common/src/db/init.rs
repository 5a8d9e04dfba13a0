//! Database initialization
//!
//! Creates the database file on first run and every table idempotently, so
//! the ingest pipeline and the query service can start in either order.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every connection
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Catalog tables in delete order (children before parents).
///
/// These are the tables a catalog refresh replaces. Favorites, stored quiz
/// results and the refresh log survive refreshes.
pub const CATALOG_TABLES: &[&str] = &[
    "programme_trait_aggregate",
    "programme_disciplines",
    "programme_fields",
    "programme_study_modes",
    "programme_languages",
    "programme_locations",
    "deadlines",
    "programmes",
    "institutions",
    "institution_types",
    "institutional_controls",
    "degrees",
    "disciplines",
    "fields_of_study",
    "areas_of_study",
    "study_modes",
    "teaching_languages",
    "locations",
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Institutions feed
    create_institution_types_table(pool).await?;
    create_institutional_controls_table(pool).await?;
    create_institutions_table(pool).await?;

    // Reference entities of the programme feed
    create_degrees_table(pool).await?;
    create_areas_of_study_table(pool).await?;
    create_fields_of_study_table(pool).await?;
    create_lookup_table(pool, "disciplines").await?;
    create_lookup_table(pool, "study_modes").await?;
    create_lookup_table(pool, "teaching_languages").await?;
    create_lookup_table(pool, "locations").await?;

    create_programmes_table(pool).await?;
    create_deadlines_table(pool).await?;

    // Linking tables
    create_junction_table(pool, "programme_disciplines", "discipline_id", "disciplines").await?;
    create_junction_table(pool, "programme_fields", "field_id", "fields_of_study").await?;
    create_junction_table(pool, "programme_study_modes", "mode_id", "study_modes").await?;
    create_programme_languages_table(pool).await?;
    create_junction_table(pool, "programme_locations", "location_id", "locations").await?;

    // Derived data
    create_programme_trait_aggregate_table(pool).await?;

    // Quiz and account data
    create_quiz_questions_table(pool).await?;
    create_favorites_table(pool).await?;
    create_quiz_results_table(pool).await?;
    create_refresh_log_table(pool).await?;

    Ok(())
}

async fn create_institution_types_table(pool: &SqlitePool) -> Result<()> {
    create_lookup_table(pool, "institution_types").await
}

async fn create_institutional_controls_table(pool: &SqlitePool) -> Result<()> {
    create_lookup_table(pool, "institutional_controls").await
}

/// Plain `(id, name)` reference table
async fn create_lookup_table(pool: &SqlitePool, table: &str) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            name TEXT
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

async fn create_institutions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS institutions (
            id INTEGER PRIMARY KEY,
            name TEXT,
            short_name TEXT,
            state TEXT,
            city TEXT,
            phone TEXT,
            fax TEXT,
            homepage TEXT,
            email TEXT,
            logo TEXT,
            institution_type_id INTEGER REFERENCES institution_types(id),
            institutional_control_id INTEGER REFERENCES institutional_controls(id),
            foundation_year INTEGER,
            award_phd INTEGER,
            award_habilitation INTEGER,
            university_clinic INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_degrees_table(pool: &SqlitePool) -> Result<()> {
    create_lookup_table(pool, "degrees").await
}

/// Area of study with base trait scores (1-5, NULL until the overlay sets them)
async fn create_areas_of_study_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS areas_of_study (
            id INTEGER PRIMARY KEY,
            name TEXT,
            trait_r INTEGER CHECK (trait_r BETWEEN 1 AND 5),
            trait_i INTEGER CHECK (trait_i BETWEEN 1 AND 5),
            trait_a INTEGER CHECK (trait_a BETWEEN 1 AND 5),
            trait_s INTEGER CHECK (trait_s BETWEEN 1 AND 5),
            trait_e INTEGER CHECK (trait_e BETWEEN 1 AND 5),
            trait_c INTEGER CHECK (trait_c BETWEEN 1 AND 5)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Field of study with an optional all-or-nothing override of its area's scores
async fn create_fields_of_study_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields_of_study (
            id INTEGER PRIMARY KEY,
            name TEXT,
            area_id INTEGER REFERENCES areas_of_study(id),
            override_r INTEGER CHECK (override_r BETWEEN 1 AND 5),
            override_i INTEGER CHECK (override_i BETWEEN 1 AND 5),
            override_a INTEGER CHECK (override_a BETWEEN 1 AND 5),
            override_s INTEGER CHECK (override_s BETWEEN 1 AND 5),
            override_e INTEGER CHECK (override_e BETWEEN 1 AND 5),
            override_c INTEGER CHECK (override_c BETWEEN 1 AND 5)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fields_of_study_area ON fields_of_study(area_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_programmes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programmes (
            id INTEGER PRIMARY KEY,
            programme_type TEXT,
            name TEXT,
            institution_id INTEGER NOT NULL REFERENCES institutions(id),
            degree_id INTEGER REFERENCES degrees(id),
            fee TEXT,
            fee_comment TEXT,
            accredited INTEGER NOT NULL DEFAULT 0,
            homepage TEXT,
            comment TEXT,
            internal_degree TEXT,
            master_type TEXT,
            teaching_degrees INTEGER NOT NULL DEFAULT 0,
            duration TEXT,
            target_group TEXT,
            admission_term TEXT,
            admission_mode TEXT,
            admission_requirement TEXT,
            admission_link TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_programmes_type ON programmes(programme_type)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_deadlines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deadlines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            programme_id INTEGER NOT NULL REFERENCES programmes(id) ON DELETE CASCADE,
            name TEXT,
            term TEXT,
            deadline_type TEXT,
            begins TEXT,
            ends TEXT,
            comment TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_deadlines_programme ON deadlines(programme_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Programme-to-entity link, unique per pair
async fn create_junction_table(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    parent: &str,
) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            programme_id INTEGER NOT NULL REFERENCES programmes(id) ON DELETE CASCADE,
            {column} INTEGER NOT NULL REFERENCES {parent}(id) ON DELETE CASCADE,
            PRIMARY KEY (programme_id, {column})
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    Ok(())
}

async fn create_programme_languages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programme_languages (
            programme_id INTEGER NOT NULL REFERENCES programmes(id) ON DELETE CASCADE,
            language_id INTEGER NOT NULL REFERENCES teaching_languages(id) ON DELETE CASCADE,
            is_main INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (programme_id, language_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-programme effective trait vector, written only by the aggregate refresh
async fn create_programme_trait_aggregate_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programme_trait_aggregate (
            programme_id INTEGER PRIMARY KEY,
            trait_r REAL NOT NULL,
            trait_i REAL NOT NULL,
            trait_a REAL NOT NULL,
            trait_s REAL NOT NULL,
            trait_e REAL NOT NULL,
            trait_c REAL NOT NULL,
            source_fields INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_quiz_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            id INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            trait TEXT NOT NULL CHECK (trait IN ('R', 'I', 'A', 'S', 'E', 'C'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Favorites keep insertion order through the autoincrement id
async fn create_favorites_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            programme_id INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (account_id, programme_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_quiz_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_results (
            account_id INTEGER PRIMARY KEY,
            result_ids TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_refresh_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TIMESTAMP NOT NULL,
            finished_at TIMESTAMP NOT NULL,
            report TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
