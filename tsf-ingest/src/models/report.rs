//! Refresh results and collected issues
//!
//! Every stage returns its counters as a value so callers and tests can
//! observe what happened without scraping logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorSeverity {
    /// Degraded data, refresh continues
    Warning,
    /// Record left out, refresh continues
    Skip,
    /// Refresh aborted
    Fatal,
}

/// Issue recorded during a refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
    /// Stable code (e.g. "PARTIAL_OVERRIDE", "MISSING_ID")
    pub code: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Entity the issue refers to, when known
    pub entity_id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

impl ImportIssue {
    fn new(severity: ErrorSeverity, code: &str, message: String, entity_id: Option<i64>) -> Self {
        Self {
            code: code.to_string(),
            message,
            severity,
            entity_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn warning(code: &str, message: String, entity_id: Option<i64>) -> Self {
        Self::new(ErrorSeverity::Warning, code, message, entity_id)
    }

    pub fn skip(code: &str, message: String, entity_id: Option<i64>) -> Self {
        Self::new(ErrorSeverity::Skip, code, message, entity_id)
    }

    pub fn fatal(code: &str, message: String, entity_id: Option<i64>) -> Self {
        Self::new(ErrorSeverity::Fatal, code, message, entity_id)
    }
}

/// Relational loader counters for one feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Records handed to the loader
    pub records_seen: usize,
    /// Owning rows written
    pub records_loaded: usize,
    /// Records left out by the parser (no usable id)
    pub records_skipped: usize,
    /// Reference entity upserts (degrees, areas, locations, ...)
    pub reference_rows_upserted: usize,
    /// Junction rows newly created
    pub junction_rows_inserted: usize,
    /// Junction rows that already existed
    pub junction_rows_existing: usize,
    pub deadlines_inserted: usize,
}

/// Overlay importer counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayReport {
    pub target: String,
    /// Data rows staged from the file
    pub rows_read: usize,
    /// Live rows updated
    pub rows_applied: usize,
    /// Staged rows whose id does not exist in the live table
    pub rows_dropped: usize,
}

/// Consistency gate findings that did not abort the refresh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Areas referenced by at least one programme
    pub published_areas: usize,
    /// Fields linked to at least one programme
    pub fields_checked: usize,
    /// Linked fields without any override (area base used)
    pub fields_without_override: Vec<i64>,
    /// Linked fields with some but not all override values (area base used)
    pub fields_with_partial_override: Vec<i64>,
}

/// Aggregate refresh counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub programmes_with_vector: usize,
    pub programmes_without_vector: usize,
}

/// Question bank import counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub questions_loaded: usize,
}

/// Refresh completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub session_id: Uuid,
    pub institutions: LoadReport,
    pub programmes: LoadReport,
    pub area_overlay: OverlayReport,
    pub field_overlay: OverlayReport,
    pub gate: GateReport,
    pub aggregate: AggregateReport,
    /// Present when a question bank file was part of the refresh
    pub questions: Option<QuestionReport>,
    pub issues: Vec<ImportIssue>,
    pub duration_ms: u64,
}

impl RefreshReport {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            institutions: LoadReport::default(),
            programmes: LoadReport::default(),
            area_overlay: OverlayReport::default(),
            field_overlay: OverlayReport::default(),
            gate: GateReport::default(),
            aggregate: AggregateReport::default(),
            questions: None,
            issues: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Count issues by severity
    pub fn count_by_severity(&self, severity: ErrorSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}
