//! Consistency gate
//!
//! Runs after the overlays and before the aggregate is rebuilt. An area of
//! study is published when at least one field of study linked to a programme
//! belongs to it; a published area without all six base scores makes the
//! refresh invalid. Fields without a complete override only degrade to their
//! area's base scores and are reported as warnings.

use sqlx::{Row, Sqlite, Transaction};
use tracing::{error, info, warn};
use tsf_common::db::{AreaOfStudy, FieldOfStudy, TraitScores};

use crate::error::{IngestError, IngestResult};
use crate::models::{GateReport, ImportIssue};

fn scores_from_row(row: &sqlx::sqlite::SqliteRow, prefix: &str) -> Result<TraitScores, sqlx::Error> {
    Ok(TraitScores {
        r: row.try_get(format!("{prefix}r").as_str())?,
        i: row.try_get(format!("{prefix}i").as_str())?,
        a: row.try_get(format!("{prefix}a").as_str())?,
        s: row.try_get(format!("{prefix}s").as_str())?,
        e: row.try_get(format!("{prefix}e").as_str())?,
        c: row.try_get(format!("{prefix}c").as_str())?,
    })
}

async fn published_areas(tx: &mut Transaction<'_, Sqlite>) -> IngestResult<Vec<AreaOfStudy>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.name, a.trait_r, a.trait_i, a.trait_a, a.trait_s, a.trait_e, a.trait_c
        FROM areas_of_study a
        WHERE EXISTS (
            SELECT 1 FROM fields_of_study f
            JOIN programme_fields pf ON pf.field_id = f.id
            WHERE f.area_id = a.id
        )
        ORDER BY a.id
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(AreaOfStudy {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                scores: scores_from_row(row, "trait_")?,
            })
        })
        .collect::<Result<_, sqlx::Error>>()
        .map_err(IngestError::from)
}

async fn linked_fields(tx: &mut Transaction<'_, Sqlite>) -> IngestResult<Vec<FieldOfStudy>> {
    let rows = sqlx::query(
        r#"
        SELECT f.id, f.name, f.area_id,
               f.override_r, f.override_i, f.override_a, f.override_s, f.override_e, f.override_c
        FROM fields_of_study f
        WHERE EXISTS (SELECT 1 FROM programme_fields pf WHERE pf.field_id = f.id)
        ORDER BY f.id
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(FieldOfStudy {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                area_id: row.try_get("area_id")?,
                score_override: scores_from_row(row, "override_")?,
            })
        })
        .collect::<Result<_, sqlx::Error>>()
        .map_err(IngestError::from)
}

/// Check published trait data.
///
/// Returns the warnings when the data may be published, or
/// [`IngestError::IncompleteAreaScores`] naming every offending area.
pub async fn verify(
    tx: &mut Transaction<'_, Sqlite>,
    issues: &mut Vec<ImportIssue>,
) -> IngestResult<GateReport> {
    let areas = published_areas(tx).await?;
    let incomplete: Vec<i64> = areas
        .iter()
        .filter(|a| !a.scores.is_complete())
        .map(|a| a.id)
        .collect();

    if !incomplete.is_empty() {
        error!(area_ids = ?incomplete, "Published areas of study lack trait scores");
        return Err(IngestError::IncompleteAreaScores {
            area_ids: incomplete,
        });
    }

    let fields = linked_fields(tx).await?;
    let mut report = GateReport {
        published_areas: areas.len(),
        fields_checked: fields.len(),
        ..Default::default()
    };

    for field in &fields {
        if field.score_override.is_partial() {
            warn!(
                field_id = field.id,
                "Partial trait override ignored, area base scores used"
            );
            issues.push(ImportIssue::warning(
                "PARTIAL_OVERRIDE",
                format!(
                    "Field of study {} has an incomplete override; area {:?} base scores used",
                    field.id, field.area_id
                ),
                Some(field.id),
            ));
            report.fields_with_partial_override.push(field.id);
        } else if !field.score_override.is_complete() {
            report.fields_without_override.push(field.id);
        }
    }

    if !report.fields_without_override.is_empty() {
        warn!(
            count = report.fields_without_override.len(),
            "Fields of study without override fall back to area base scores"
        );
        issues.push(ImportIssue::warning(
            "MISSING_OVERRIDE",
            format!(
                "{} fields of study without override use area base scores",
                report.fields_without_override.len()
            ),
            None,
        ));
    }

    info!(
        published_areas = report.published_areas,
        fields = report.fields_checked,
        partial = report.fields_with_partial_override.len(),
        missing = report.fields_without_override.len(),
        "Consistency gate passed"
    );

    Ok(report)
}
