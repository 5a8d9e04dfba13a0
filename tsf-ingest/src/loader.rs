//! Relational loader
//!
//! Writes parsed feed records into the normalized tables. Reference entities
//! are upserted before the row that points at them and junction rows are
//! inserted last with insert-or-ignore, so loading the same records twice
//! leaves the tables unchanged. All writes go through the caller's
//! transaction; the first failing row aborts the whole load.

use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use crate::error::{IngestError, IngestResult};
use crate::feed::{InstitutionRecord, NamedEntity, ProgrammeRecord};
use crate::models::LoadReport;

type Tx<'c> = Transaction<'c, Sqlite>;

/// Upsert into a plain `(id, name)` table; a missing name never erases a known one
async fn upsert_named(tx: &mut Tx<'_>, table: &'static str, entity: &NamedEntity) -> IngestResult<()> {
    let sql = format!(
        "INSERT INTO {table} (id, name) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET name = COALESCE(excluded.name, {table}.name)"
    );
    sqlx::query(&sql)
        .bind(entity.id)
        .bind(&entity.name)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Insert a programme link; returns `true` when the pair was new
async fn link(
    tx: &mut Tx<'_>,
    table: &'static str,
    column: &'static str,
    programme_id: i64,
    entity_id: i64,
) -> IngestResult<bool> {
    let sql = format!("INSERT OR IGNORE INTO {table} (programme_id, {column}) VALUES (?, ?)");
    let result = sqlx::query(&sql)
        .bind(programme_id)
        .bind(entity_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() == 1)
}

fn count_link(report: &mut LoadReport, inserted: bool) {
    if inserted {
        report.junction_rows_inserted += 1;
    } else {
        report.junction_rows_existing += 1;
    }
}

// ============================================================================
// Institutions
// ============================================================================

/// Load institutions with their type and control reference entities
pub async fn load_institutions(
    tx: &mut Tx<'_>,
    records: &[InstitutionRecord],
) -> IngestResult<LoadReport> {
    let mut report = LoadReport {
        records_seen: records.len(),
        ..Default::default()
    };

    for record in records {
        if let Some(kind) = &record.institution_type {
            upsert_named(tx, "institution_types", kind).await?;
            report.reference_rows_upserted += 1;
        }
        if let Some(control) = &record.institutional_control {
            upsert_named(tx, "institutional_controls", control).await?;
            report.reference_rows_upserted += 1;
        }

        sqlx::query(
            r#"
            INSERT INTO institutions (
                id, name, short_name, state, city, phone, fax, homepage, email, logo,
                institution_type_id, institutional_control_id, foundation_year,
                award_phd, award_habilitation, university_clinic
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                short_name = excluded.short_name,
                state = excluded.state,
                city = excluded.city,
                phone = excluded.phone,
                fax = excluded.fax,
                homepage = excluded.homepage,
                email = excluded.email,
                logo = excluded.logo,
                institution_type_id = excluded.institution_type_id,
                institutional_control_id = excluded.institutional_control_id,
                foundation_year = excluded.foundation_year,
                award_phd = excluded.award_phd,
                award_habilitation = excluded.award_habilitation,
                university_clinic = excluded.university_clinic
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.short_name)
        .bind(&record.state)
        .bind(&record.city)
        .bind(&record.phone)
        .bind(&record.fax)
        .bind(&record.homepage)
        .bind(&record.email)
        .bind(&record.logo)
        .bind(record.institution_type.as_ref().map(|t| t.id))
        .bind(record.institutional_control.as_ref().map(|c| c.id))
        .bind(record.foundation_year)
        .bind(record.award_phd)
        .bind(record.award_habilitation)
        .bind(record.university_clinic)
        .execute(&mut **tx)
        .await?;

        report.records_loaded += 1;
    }

    info!(
        loaded = report.records_loaded,
        references = report.reference_rows_upserted,
        "Institutions loaded"
    );
    Ok(report)
}

// ============================================================================
// Degree programmes
// ============================================================================

async fn institution_exists(tx: &mut Tx<'_>, id: i64) -> IngestResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM institutions WHERE id = ?)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

/// Load programmes, their reference entities, deadlines and links.
///
/// Institutions must already be loaded: a programme without a known
/// institution aborts the load.
pub async fn load_programmes(
    tx: &mut Tx<'_>,
    records: &[ProgrammeRecord],
) -> IngestResult<LoadReport> {
    let mut report = LoadReport {
        records_seen: records.len(),
        ..Default::default()
    };

    for record in records {
        load_programme(tx, record, &mut report).await?;
        report.records_loaded += 1;
    }

    info!(
        loaded = report.records_loaded,
        references = report.reference_rows_upserted,
        links_new = report.junction_rows_inserted,
        links_existing = report.junction_rows_existing,
        deadlines = report.deadlines_inserted,
        "Degree programmes loaded"
    );
    Ok(report)
}

async fn load_programme(
    tx: &mut Tx<'_>,
    record: &ProgrammeRecord,
    report: &mut LoadReport,
) -> IngestResult<()> {
    let known = match record.institution_id {
        Some(id) => institution_exists(tx, id).await?.then_some(id),
        None => None,
    };
    let institution_id = known.ok_or_else(|| IngestError::UnresolvedReference {
        programme_id: record.id,
        entity: "institution",
        reference: record
            .institution_id
            .map_or_else(|| "(none)".to_string(), |id| id.to_string()),
    })?;

    // Parents first
    if let Some(degree) = &record.degree {
        upsert_named(tx, "degrees", degree).await?;
        report.reference_rows_upserted += 1;
    }
    for field in &record.fields {
        if let Some(area) = &field.area {
            upsert_named(tx, "areas_of_study", area).await?;
            report.reference_rows_upserted += 1;
        }
        sqlx::query(
            r#"
            INSERT INTO fields_of_study (id, name, area_id) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = COALESCE(excluded.name, fields_of_study.name),
                area_id = COALESCE(excluded.area_id, fields_of_study.area_id)
            "#,
        )
        .bind(field.id)
        .bind(&field.name)
        .bind(field.area.as_ref().map(|a| a.id))
        .execute(&mut **tx)
        .await?;
        report.reference_rows_upserted += 1;
    }
    for discipline in &record.disciplines {
        upsert_named(tx, "disciplines", discipline).await?;
        report.reference_rows_upserted += 1;
    }
    for mode in &record.study_modes {
        upsert_named(tx, "study_modes", mode).await?;
        report.reference_rows_upserted += 1;
    }
    for language in &record.languages {
        let entity = NamedEntity {
            id: language.id,
            name: language.name.clone(),
        };
        upsert_named(tx, "teaching_languages", &entity).await?;
        report.reference_rows_upserted += 1;
    }
    for location in &record.locations {
        upsert_named(tx, "locations", location).await?;
        report.reference_rows_upserted += 1;
    }

    // Owning row
    sqlx::query(
        r#"
        INSERT INTO programmes (
            id, programme_type, name, institution_id, degree_id, fee, fee_comment,
            accredited, homepage, comment, internal_degree, master_type, teaching_degrees,
            duration, target_group, admission_term, admission_mode, admission_requirement,
            admission_link
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            programme_type = excluded.programme_type,
            name = excluded.name,
            institution_id = excluded.institution_id,
            degree_id = excluded.degree_id,
            fee = excluded.fee,
            fee_comment = excluded.fee_comment,
            accredited = excluded.accredited,
            homepage = excluded.homepage,
            comment = excluded.comment,
            internal_degree = excluded.internal_degree,
            master_type = excluded.master_type,
            teaching_degrees = excluded.teaching_degrees,
            duration = excluded.duration,
            target_group = excluded.target_group,
            admission_term = excluded.admission_term,
            admission_mode = excluded.admission_mode,
            admission_requirement = excluded.admission_requirement,
            admission_link = excluded.admission_link
        "#,
    )
    .bind(record.id)
    .bind(&record.programme_type)
    .bind(&record.name)
    .bind(institution_id)
    .bind(record.degree.as_ref().map(|d| d.id))
    .bind(&record.fee)
    .bind(&record.fee_comment)
    .bind(record.accredited)
    .bind(&record.homepage)
    .bind(&record.comment)
    .bind(&record.internal_degree)
    .bind(&record.master_type)
    .bind(record.teaching_degrees)
    .bind(&record.duration)
    .bind(&record.target_group)
    .bind(&record.admission_term)
    .bind(&record.admission_mode)
    .bind(&record.admission_requirement)
    .bind(&record.admission_link)
    .execute(&mut **tx)
    .await?;

    // Deadlines belong to exactly one programme and are replaced as a set
    sqlx::query("DELETE FROM deadlines WHERE programme_id = ?")
        .bind(record.id)
        .execute(&mut **tx)
        .await?;
    for deadline in &record.deadlines {
        sqlx::query(
            r#"
            INSERT INTO deadlines (programme_id, name, term, deadline_type, begins, ends, comment)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id)
        .bind(&deadline.name)
        .bind(&deadline.term)
        .bind(&deadline.deadline_type)
        .bind(&deadline.begins)
        .bind(&deadline.ends)
        .bind(&deadline.comment)
        .execute(&mut **tx)
        .await?;
        report.deadlines_inserted += 1;
    }

    // Links
    for field in &record.fields {
        let inserted = link(tx, "programme_fields", "field_id", record.id, field.id).await?;
        count_link(report, inserted);
    }
    for discipline in &record.disciplines {
        let inserted =
            link(tx, "programme_disciplines", "discipline_id", record.id, discipline.id).await?;
        count_link(report, inserted);
    }
    for mode in &record.study_modes {
        let inserted = link(tx, "programme_study_modes", "mode_id", record.id, mode.id).await?;
        count_link(report, inserted);
    }
    for location in &record.locations {
        let inserted =
            link(tx, "programme_locations", "location_id", record.id, location.id).await?;
        count_link(report, inserted);
    }
    for language in &record.languages {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO programme_languages (programme_id, language_id, is_main) VALUES (?, ?, ?)",
        )
        .bind(record.id)
        .bind(language.id)
        .bind(language.is_main)
        .execute(&mut **tx)
        .await?;
        count_link(report, result.rows_affected() == 1);
    }

    debug!(programme_id = record.id, "Programme loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FieldRecord, LanguageRecord};
    use tempfile::TempDir;
    use tsf_common::db::init_database;

    fn institution(id: i64) -> InstitutionRecord {
        InstitutionRecord {
            id,
            name: Some(format!("Hochschule {}", id)),
            short_name: None,
            state: None,
            city: Some("Berlin".to_string()),
            phone: None,
            fax: None,
            homepage: None,
            email: None,
            logo: None,
            foundation_year: None,
            award_phd: false,
            award_habilitation: false,
            university_clinic: false,
            institution_type: Some(NamedEntity {
                id: 1,
                name: Some("Universität".to_string()),
            }),
            institutional_control: None,
        }
    }

    fn programme(id: i64, institution_id: Option<i64>) -> ProgrammeRecord {
        ProgrammeRecord {
            id,
            programme_type: Some("grundständig".to_string()),
            name: Some("Informatik".to_string()),
            institution_id,
            degree: None,
            fee: None,
            fee_comment: None,
            accredited: true,
            homepage: None,
            comment: None,
            internal_degree: None,
            master_type: None,
            teaching_degrees: false,
            duration: None,
            target_group: None,
            admission_term: None,
            admission_mode: None,
            admission_requirement: None,
            admission_link: None,
            deadlines: Vec::new(),
            fields: vec![FieldRecord {
                id: 20,
                name: Some("Informatik".to_string()),
                area: Some(NamedEntity {
                    id: 2,
                    name: Some("Ingenieurwissenschaften".to_string()),
                }),
            }],
            disciplines: Vec::new(),
            study_modes: Vec::new(),
            languages: vec![LanguageRecord {
                id: 1,
                name: Some("Deutsch".to_string()),
                is_main: true,
            }],
            locations: vec![NamedEntity {
                id: 9,
                name: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_repeat_load_creates_no_duplicate_links() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("tsf.db")).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        load_institutions(&mut tx, &[institution(1)]).await.unwrap();
        let first = load_programmes(&mut tx, &[programme(100, Some(1))]).await.unwrap();
        let second = load_programmes(&mut tx, &[programme(100, Some(1))]).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.junction_rows_inserted, 3);
        assert_eq!(second.junction_rows_inserted, 0);
        assert_eq!(second.junction_rows_existing, 3);

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM programme_fields")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 1);

        let area: Option<i64> = sqlx::query_scalar("SELECT area_id FROM fields_of_study WHERE id = 20")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(area, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_institution_is_fatal() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("tsf.db")).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let result = load_programmes(&mut tx, &[programme(100, Some(42))]).await;
        assert!(matches!(
            result,
            Err(IngestError::UnresolvedReference { programme_id: 100, .. })
        ));

        let result = load_programmes(&mut tx, &[programme(101, None)]).await;
        assert!(matches!(result, Err(IngestError::UnresolvedReference { .. })));
    }
}
