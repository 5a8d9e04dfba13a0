//! Favorites and guest result reconciliation
//!
//! The `(account, programme)` pair is unique, so every write here is safe to
//! repeat.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use tsf_common::api::ReconcileReport;
use tsf_common::Result;

use super::programmes::programme_exists;

/// Outcome of storing one favorite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Store a favorite unless the pair already exists
pub async fn add(pool: &SqlitePool, account_id: i64, programme_id: i64) -> Result<AddOutcome> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO favorites (account_id, programme_id) VALUES (?, ?)",
    )
    .bind(account_id)
    .bind(programme_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        Ok(AddOutcome::AlreadyPresent)
    } else {
        debug!(account_id, programme_id, "Favorite added");
        Ok(AddOutcome::Added)
    }
}

/// Delete a favorite; returns `false` when there was nothing to delete
pub async fn remove(pool: &SqlitePool, account_id: i64, programme_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE account_id = ? AND programme_id = ?")
        .bind(account_id)
        .bind(programme_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Favorite programme ids, newest first
pub async fn list(pool: &SqlitePool, account_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT programme_id FROM favorites WHERE account_id = ? ORDER BY id DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Whether the account already holds the favorite, even for a programme a
/// later refresh dropped from the catalog
pub async fn favorite_exists(pool: &SqlitePool, account_id: i64, programme_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE account_id = ? AND programme_id = ?)",
    )
    .bind(account_id)
    .bind(programme_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

async fn attach_one(pool: &SqlitePool, account_id: i64, programme_id: i64) -> Result<Option<AddOutcome>> {
    if favorite_exists(pool, account_id, programme_id).await? {
        return Ok(Some(AddOutcome::AlreadyPresent));
    }
    if !programme_exists(pool, programme_id).await? {
        return Ok(None);
    }
    add(pool, account_id, programme_id).await.map(Some)
}

/// Attach guest results to an account as favorites.
///
/// Each id is handled on its own: a failure is logged, reported in
/// `failed` and does not stop the remaining ids. Repeated ids in one request
/// are handled once.
pub async fn reconcile(pool: &SqlitePool, account_id: i64, result_ids: &[i64]) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen = std::collections::HashSet::new();

    for &programme_id in result_ids {
        if !seen.insert(programme_id) {
            continue;
        }
        match attach_one(pool, account_id, programme_id).await {
            Ok(Some(AddOutcome::Added)) => report.attached.push(programme_id),
            Ok(Some(AddOutcome::AlreadyPresent)) => report.already_present.push(programme_id),
            Ok(None) => {
                warn!(account_id, programme_id, "Reconcile skipped unknown programme");
                report.failed.push(programme_id);
            }
            Err(e) => {
                warn!(account_id, programme_id, "Reconcile failed: {}", e);
                report.failed.push(programme_id);
            }
        }
    }

    info!(
        account_id,
        attached = report.attached.len(),
        already_present = report.already_present.len(),
        failed = report.failed.len(),
        "Guest results reconciled"
    );
    report
}
