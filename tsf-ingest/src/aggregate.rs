//! Programme trait aggregate refresh
//!
//! A field of study's effective vector is its override when all six values
//! are present, otherwise its area's base scores. A programme's vector is the
//! mean of the effective vectors of its linked fields; programmes without any
//! field carrying a complete effective vector get no aggregate row.
//!
//! The rebuild runs inside the refresh transaction, so readers keep seeing
//! the previous aggregate until the commit.

use sqlx::{Sqlite, Transaction};
use tracing::info;

use crate::error::IngestResult;
use crate::models::AggregateReport;

const OVERRIDE_COMPLETE: &str = "f.override_r IS NOT NULL AND f.override_i IS NOT NULL \
     AND f.override_a IS NOT NULL AND f.override_s IS NOT NULL \
     AND f.override_e IS NOT NULL AND f.override_c IS NOT NULL";

fn effective(letter: char) -> String {
    format!("CASE WHEN {OVERRIDE_COMPLETE} THEN f.override_{letter} ELSE a.trait_{letter} END AS {letter}")
}

/// Replace the aggregate with vectors computed from the current tables
pub async fn refresh(tx: &mut Transaction<'_, Sqlite>) -> IngestResult<AggregateReport> {
    sqlx::query("DELETE FROM programme_trait_aggregate")
        .execute(&mut **tx)
        .await?;

    let columns: Vec<String> = ['r', 'i', 'a', 's', 'e', 'c'].into_iter().map(effective).collect();
    let sql = format!(
        r#"
        INSERT INTO programme_trait_aggregate
            (programme_id, trait_r, trait_i, trait_a, trait_s, trait_e, trait_c, source_fields)
        SELECT pf.programme_id,
               AVG(ef.r), AVG(ef.i), AVG(ef.a), AVG(ef.s), AVG(ef.e), AVG(ef.c),
               COUNT(*)
        FROM programme_fields pf
        JOIN (
            SELECT f.id AS field_id, {columns}
            FROM fields_of_study f
            LEFT JOIN areas_of_study a ON a.id = f.area_id
        ) ef ON ef.field_id = pf.field_id
        WHERE ef.r IS NOT NULL AND ef.i IS NOT NULL AND ef.a IS NOT NULL
          AND ef.s IS NOT NULL AND ef.e IS NOT NULL AND ef.c IS NOT NULL
        GROUP BY pf.programme_id
        "#,
        columns = columns.join(", ")
    );

    let with_vector = sqlx::query(&sql).execute(&mut **tx).await?.rows_affected() as usize;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM programmes")
        .fetch_one(&mut **tx)
        .await?;

    let report = AggregateReport {
        programmes_with_vector: with_vector,
        programmes_without_vector: (total as usize).saturating_sub(with_vector),
    };

    info!(
        with_vector = report.programmes_with_vector,
        without_vector = report.programmes_without_vector,
        "Programme trait aggregate rebuilt"
    );

    Ok(report)
}
