//! Catalog refresh orchestration
//!
//! Every input is parsed and validated before the database is touched. The
//! catalog tables are then emptied and reloaded, the overlays applied, the
//! consistency gate run and the aggregate rebuilt inside a single
//! transaction. Readers see the previous catalog until the commit; any error
//! rolls everything back.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use tracing::{error, info};
use tsf_common::api::QuizQuestion;
use tsf_common::config::IngestConfig;
use tsf_common::db::CATALOG_TABLES;

use crate::error::{IngestError, IngestResult};
use crate::feed::{self, InstitutionRecord, ParsedFeed, ProgrammeRecord};
use crate::models::{ImportIssue, RefreshReport, RefreshSession, RefreshState};
use crate::overlay::{self, OverlayFormat, OverlayRow, OverlayTarget};
use crate::{aggregate, gate, loader, questions};

/// Input file locations
#[derive(Debug, Clone)]
pub struct RefreshPaths {
    pub institutions: PathBuf,
    pub programmes: PathBuf,
    pub area_overlay: PathBuf,
    pub field_overlay: PathBuf,
    pub questions: Option<PathBuf>,
}

/// Raw input documents
#[derive(Debug, Clone, Default)]
pub struct RefreshInputs {
    pub institutions: Vec<u8>,
    pub programmes: Vec<u8>,
    pub area_overlay: Vec<u8>,
    pub field_overlay: Vec<u8>,
    /// Question bank; the stored bank is kept when absent
    pub questions: Option<Vec<u8>>,
}

impl RefreshInputs {
    pub fn read(paths: &RefreshPaths) -> IngestResult<Self> {
        Ok(Self {
            institutions: std::fs::read(&paths.institutions)?,
            programmes: std::fs::read(&paths.programmes)?,
            area_overlay: std::fs::read(&paths.area_overlay)?,
            field_overlay: std::fs::read(&paths.field_overlay)?,
            questions: paths
                .questions
                .as_ref()
                .map(std::fs::read)
                .transpose()?,
        })
    }
}

/// Parser settings
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Preferred language of localized feed text
    pub language: String,
    pub overlay_format: OverlayFormat,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            language: IngestConfig::default().language,
            overlay_format: OverlayFormat::default(),
        }
    }
}

impl TryFrom<&IngestConfig> for RefreshOptions {
    type Error = tsf_common::Error;

    fn try_from(config: &IngestConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            language: config.language.clone(),
            overlay_format: OverlayFormat::try_from(config)?,
        })
    }
}

struct ParsedInputs {
    institutions: ParsedFeed<InstitutionRecord>,
    programmes: ParsedFeed<ProgrammeRecord>,
    area_rows: Vec<OverlayRow>,
    field_rows: Vec<OverlayRow>,
    questions: Option<Vec<QuizQuestion>>,
}

fn parse_inputs(inputs: &RefreshInputs, options: &RefreshOptions) -> IngestResult<ParsedInputs> {
    let institutions = feed::parse_institutions(&inputs.institutions, &options.language)?;
    let programmes = feed::parse_programmes(&inputs.programmes, &options.language)?;
    let area_rows = overlay::parse_overlay(
        &inputs.area_overlay,
        OverlayTarget::Area,
        &options.overlay_format,
    )?;
    let field_rows = overlay::parse_overlay(
        &inputs.field_overlay,
        OverlayTarget::Field,
        &options.overlay_format,
    )?;
    let questions = inputs
        .questions
        .as_deref()
        .map(questions::parse_questions)
        .transpose()?;

    Ok(ParsedInputs {
        institutions,
        programmes,
        area_rows,
        field_rows,
        questions,
    })
}

async fn truncate_catalog(tx: &mut Transaction<'_, Sqlite>) -> IngestResult<()> {
    for table in CATALOG_TABLES {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn write_catalog(
    tx: &mut Transaction<'_, Sqlite>,
    parsed: &ParsedInputs,
    session: &mut RefreshSession,
) -> IngestResult<()> {
    session.transition_to(RefreshState::Loading);
    truncate_catalog(tx).await?;

    let mut institutions = loader::load_institutions(tx, &parsed.institutions.records).await?;
    institutions.records_skipped = parsed.institutions.skipped;
    session.report.institutions = institutions;

    let mut programmes = loader::load_programmes(tx, &parsed.programmes.records).await?;
    programmes.records_skipped = parsed.programmes.skipped;
    session.report.programmes = programmes;

    session.transition_to(RefreshState::Overlaying);
    session.report.area_overlay =
        overlay::apply_overlay(tx, OverlayTarget::Area, &parsed.area_rows).await?;
    session.report.field_overlay =
        overlay::apply_overlay(tx, OverlayTarget::Field, &parsed.field_rows).await?;

    session.transition_to(RefreshState::Verifying);
    session.report.gate = gate::verify(tx, &mut session.report.issues).await?;

    session.transition_to(RefreshState::Publishing);
    if let Some(questions) = &parsed.questions {
        session.report.questions = Some(questions::load_questions(tx, questions).await?);
    }
    session.report.aggregate = aggregate::refresh(tx).await?;

    let report_json = serde_json::to_string(&session.report)
        .map_err(|e| tsf_common::Error::Internal(format!("Failed to serialize report: {}", e)))?;
    sqlx::query("INSERT INTO refresh_log (started_at, finished_at, report) VALUES (?, ?, ?)")
        .bind(session.started_at)
        .bind(Utc::now())
        .bind(report_json)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn publish(
    pool: &SqlitePool,
    parsed: &ParsedInputs,
    session: &mut RefreshSession,
) -> IngestResult<()> {
    let mut tx = pool.begin().await?;

    if let Err(e) = write_catalog(&mut tx, parsed, session).await {
        if let Err(rollback_error) = tx.rollback().await {
            error!("Rollback failed: {}", rollback_error);
        }
        return Err(e);
    }

    tx.commit().await?;
    Ok(())
}

/// Record the aborting error as fatal issues and end the session
fn fail(session: &mut RefreshSession, e: &IngestError) {
    let issues = &mut session.report.issues;
    match e {
        IngestError::IncompleteAreaScores { area_ids } => {
            for area_id in area_ids {
                issues.push(ImportIssue::fatal(
                    e.code(),
                    format!("Area {} is published without all six trait scores", area_id),
                    Some(*area_id),
                ));
            }
        }
        IngestError::UnresolvedReference { programme_id, .. } => {
            issues.push(ImportIssue::fatal(e.code(), e.to_string(), Some(*programme_id)));
        }
        _ => issues.push(ImportIssue::fatal(e.code(), e.to_string(), None)),
    }

    error!(
        session_id = %session.session_id,
        code = e.code(),
        issues = session.report.issues.len(),
        "Catalog refresh failed in {:?}, rolled back: {}",
        session.state,
        e
    );
    session.transition_to(RefreshState::Failed);
}

/// Run a complete catalog refresh
pub async fn run_refresh(
    pool: &SqlitePool,
    inputs: &RefreshInputs,
    options: &RefreshOptions,
) -> IngestResult<RefreshReport> {
    let mut session = RefreshSession::new();
    info!(session_id = %session.session_id, "Catalog refresh started");

    let parsed = match parse_inputs(inputs, options) {
        Ok(parsed) => parsed,
        Err(e) => {
            fail(&mut session, &e);
            return Err(e);
        }
    };
    session
        .report
        .issues
        .extend(parsed.institutions.issues.iter().cloned());
    session
        .report
        .issues
        .extend(parsed.programmes.issues.iter().cloned());

    if let Err(e) = publish(pool, &parsed, &mut session).await {
        fail(&mut session, &e);
        return Err(e);
    }

    session.transition_to(RefreshState::Completed);
    info!(
        session_id = %session.session_id,
        institutions = session.report.institutions.records_loaded,
        programmes = session.report.programmes.records_loaded,
        with_vector = session.report.aggregate.programmes_with_vector,
        warnings = session.report.issues.len(),
        duration_ms = session.report.duration_ms,
        "Catalog refresh committed"
    );

    Ok(session.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorSeverity;

    #[test]
    fn test_incomplete_areas_become_fatal_issues() {
        let mut session = RefreshSession::new();
        session.transition_to(RefreshState::Verifying);

        fail(
            &mut session,
            &IngestError::IncompleteAreaScores { area_ids: vec![3, 5] },
        );

        assert_eq!(session.state, RefreshState::Failed);
        assert!(session.ended_at.is_some());

        let fatal: Vec<&ImportIssue> = session
            .report
            .issues
            .iter()
            .filter(|i| i.severity == ErrorSeverity::Fatal)
            .collect();
        assert_eq!(fatal.len(), 2);
        assert_eq!(fatal[0].code, "INCOMPLETE_AREA_SCORES");
        assert_eq!(fatal[0].entity_id, Some(3));
        assert_eq!(fatal[1].entity_id, Some(5));
    }

    #[test]
    fn test_unresolved_reference_names_programme() {
        let mut session = RefreshSession::new();
        fail(
            &mut session,
            &IngestError::UnresolvedReference {
                programme_id: 200,
                entity: "institution",
                reference: "3".to_string(),
            },
        );

        let issue = &session.report.issues[0];
        assert_eq!(issue.severity, ErrorSeverity::Fatal);
        assert_eq!(issue.code, "UNRESOLVED_REFERENCE");
        assert_eq!(issue.entity_id, Some(200));
    }
}
