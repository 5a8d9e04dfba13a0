//! Stored quiz results, one row per account

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tsf_common::{Error, Result};

/// Latest saved result list
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResults {
    pub result_ids: Vec<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Replace the account's stored result list
pub async fn save(pool: &SqlitePool, account_id: i64, result_ids: &[i64]) -> Result<StoredResults> {
    let json = serde_json::to_string(result_ids)
        .map_err(|e| Error::Internal(format!("Failed to encode result ids: {}", e)))?;
    let updated_at = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO quiz_results (account_id, result_ids, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(account_id) DO UPDATE SET
            result_ids = excluded.result_ids,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account_id)
    .bind(json)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(StoredResults {
        result_ids: result_ids.to_vec(),
        updated_at,
    })
}

/// `None` when the account never saved results
pub async fn get(pool: &SqlitePool, account_id: i64) -> Result<Option<StoredResults>> {
    let row: Option<(String, DateTime<Utc>)> =
        sqlx::query_as("SELECT result_ids, updated_at FROM quiz_results WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(pool)
            .await?;

    row.map(|(json, updated_at)| {
        let result_ids = serde_json::from_str(&json)
            .map_err(|e| Error::Internal(format!("Corrupt stored results for {}: {}", account_id, e)))?;
        Ok(StoredResults {
            result_ids,
            updated_at,
        })
    })
    .transpose()
}
