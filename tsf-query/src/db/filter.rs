//! Candidate selection queries
//!
//! Each function is one SQL statement, so a single request never mixes two
//! refresh snapshots.

use sqlx::SqlitePool;
use tsf_common::{Result, TraitVector};

use super::id_list;

#[derive(Debug, sqlx::FromRow)]
struct AggregateRow {
    programme_id: i64,
    trait_r: f64,
    trait_i: f64,
    trait_a: f64,
    trait_s: f64,
    trait_e: f64,
    trait_c: f64,
}

/// Programme ids of one programme type, or every programme for `None`
pub async fn programme_ids(pool: &SqlitePool, programme_type: Option<&str>) -> Result<Vec<i64>> {
    let ids = match programme_type {
        Some(t) => {
            sqlx::query_scalar("SELECT id FROM programmes WHERE programme_type = ? ORDER BY id")
                .bind(t)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT id FROM programmes ORDER BY id")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(ids)
}

/// Aggregate vectors of the given candidates; candidates without a vector are absent
pub async fn candidate_vectors(
    pool: &SqlitePool,
    candidates: &[i64],
) -> Result<Vec<(i64, TraitVector)>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<AggregateRow> = sqlx::query_as(
        r#"
        SELECT programme_id, trait_r, trait_i, trait_a, trait_s, trait_e, trait_c
        FROM programme_trait_aggregate
        WHERE programme_id IN (SELECT value FROM json_each(?))
        ORDER BY programme_id
        "#,
    )
    .bind(id_list(candidates))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.programme_id,
                TraitVector::new([r.trait_r, r.trait_i, r.trait_a, r.trait_s, r.trait_e, r.trait_c]),
            )
        })
        .collect())
}
