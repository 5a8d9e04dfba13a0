//! Programme lookups

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tsf_common::api::ProgrammeSummary;
use tsf_common::db::{Deadline, NamedRef, Programme};
use tsf_common::Result;

use super::id_list;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LanguageRef {
    pub id: i64,
    pub name: Option<String>,
    pub is_main: bool,
}

/// Full programme record served by the detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeDetail {
    #[serde(flatten)]
    pub programme: Programme,
    pub deadlines: Vec<Deadline>,
    pub fields_of_study: Vec<NamedRef>,
    pub disciplines: Vec<NamedRef>,
    pub study_modes: Vec<NamedRef>,
    pub teaching_languages: Vec<LanguageRef>,
    pub locations: Vec<NamedRef>,
}

const PROGRAMME_SELECT: &str = r#"
    SELECT p.id, p.programme_type, p.name, p.institution_id,
           i.name AS institution_name, i.city,
           p.degree_id, d.name AS degree_name,
           p.fee, p.fee_comment, p.accredited, p.homepage, p.comment,
           p.internal_degree, p.master_type, p.teaching_degrees, p.duration,
           p.target_group, p.admission_term, p.admission_mode,
           p.admission_requirement, p.admission_link
    FROM programmes p
    JOIN institutions i ON i.id = p.institution_id
    LEFT JOIN degrees d ON d.id = p.degree_id
"#;

async fn linked(
    conn: &mut SqliteConnection,
    junction: &str,
    column: &str,
    table: &str,
    programme_id: i64,
) -> Result<Vec<NamedRef>> {
    let sql = format!(
        "SELECT t.id, t.name FROM {junction} j JOIN {table} t ON t.id = j.{column}
         WHERE j.programme_id = ? ORDER BY t.id"
    );
    Ok(sqlx::query_as(&sql).bind(programme_id).fetch_all(conn).await?)
}

/// One programme with everything linked to it; `None` when the id is unknown.
///
/// All statements run in one read transaction so the record never mixes two
/// catalog refreshes.
pub async fn get_programme(pool: &SqlitePool, id: i64) -> Result<Option<ProgrammeDetail>> {
    let mut tx = pool.begin().await?;

    let programme: Option<Programme> = sqlx::query_as(&format!("{PROGRAMME_SELECT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(programme) = programme else {
        tx.commit().await?;
        return Ok(None);
    };

    let deadlines = sqlx::query_as(
        "SELECT name, term, deadline_type, begins, ends, comment
         FROM deadlines WHERE programme_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let teaching_languages = sqlx::query_as(
        r#"
        SELECT t.id, t.name, j.is_main
        FROM programme_languages j JOIN teaching_languages t ON t.id = j.language_id
        WHERE j.programme_id = ?
        ORDER BY j.is_main DESC, t.id
        "#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let fields_of_study = linked(&mut *tx, "programme_fields", "field_id", "fields_of_study", id).await?;
    let disciplines =
        linked(&mut *tx, "programme_disciplines", "discipline_id", "disciplines", id).await?;
    let study_modes = linked(&mut *tx, "programme_study_modes", "mode_id", "study_modes", id).await?;
    let locations = linked(&mut *tx, "programme_locations", "location_id", "locations", id).await?;
    tx.commit().await?;

    Ok(Some(ProgrammeDetail {
        programme,
        deadlines,
        fields_of_study,
        disciplines,
        study_modes,
        teaching_languages,
        locations,
    }))
}

/// Summaries in request order; unknown ids are skipped
pub async fn get_summaries(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<ProgrammeSummary>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Programme> = sqlx::query_as(&format!(
        "{PROGRAMME_SELECT} WHERE p.id IN (SELECT value FROM json_each(?))"
    ))
    .bind(id_list(ids))
    .fetch_all(pool)
    .await?;

    let by_id: HashMap<i64, Programme> = rows.into_iter().map(|p| (p.id, p)).collect();

    Ok(ids
        .iter()
        .filter_map(|id| by_id.get(id))
        .map(|p| ProgrammeSummary {
            id: p.id,
            name: p.name.clone(),
            programme_type: p.programme_type.clone(),
            degree: p.degree_name.clone(),
            institution: p.institution_name.clone(),
            city: p.city.clone(),
        })
        .collect())
}

pub async fn programme_exists(pool: &SqlitePool, id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM programmes WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}
