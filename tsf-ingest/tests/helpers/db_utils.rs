//! Database Test Utilities

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;
use tsf_common::db::init_database;
use tsf_ingest::RefreshInputs;

/// Create a temporary database with the full schema
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let pool = init_database(&temp_dir.path().join("test_tsf.db")).await?;
    Ok((temp_dir, pool))
}

/// Contents of a file under tests/fixtures
pub fn fixture(name: &str) -> Vec<u8> {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect();
    std::fs::read(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

/// The consistent fixture set, question bank included
pub fn fixture_inputs() -> RefreshInputs {
    RefreshInputs {
        institutions: fixture("institutions.xml"),
        programmes: fixture("degreeprogrammes.xml"),
        area_overlay: fixture("area_overlay.csv"),
        field_overlay: fixture("field_overlay.csv"),
        questions: Some(fixture("questions.csv")),
    }
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("count {}: {}", table, e))
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AggregateRow {
    pub programme_id: i64,
    pub trait_r: f64,
    pub trait_i: f64,
    pub trait_a: f64,
    pub trait_s: f64,
    pub trait_e: f64,
    pub trait_c: f64,
    pub source_fields: i64,
}

impl AggregateRow {
    pub fn vector(&self) -> [f64; 6] {
        [
            self.trait_r,
            self.trait_i,
            self.trait_a,
            self.trait_s,
            self.trait_e,
            self.trait_c,
        ]
    }
}

pub async fn aggregate_rows(pool: &SqlitePool) -> Vec<AggregateRow> {
    sqlx::query_as(
        "SELECT programme_id, trait_r, trait_i, trait_a, trait_s, trait_e, trait_c, source_fields
         FROM programme_trait_aggregate ORDER BY programme_id",
    )
    .fetch_all(pool)
    .await
    .expect("aggregate rows")
}
