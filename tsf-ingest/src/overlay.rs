//! Trait-score overlay importer
//!
//! Overlay files are delimited text with the column contract
//! `id, R, I, A, S, E, C`. Rows are validated completely before anything is
//! written, staged in a temporary table of the same shape and applied to the
//! live table with one joined UPDATE. Staged ids that do not exist in the
//! live table are counted and dropped.

use sqlx::{Sqlite, Transaction};
use tracing::{info, warn};
use tsf_common::config::IngestConfig;

use crate::error::{IngestError, IngestResult};
use crate::models::OverlayReport;

const STAGING_TABLE: &str = "overlay_staging";

/// Live table an overlay applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayTarget {
    /// Base scores of areas of study
    Area,
    /// Score overrides of fields of study
    Field,
}

impl OverlayTarget {
    pub fn table(self) -> &'static str {
        match self {
            OverlayTarget::Area => "areas_of_study",
            OverlayTarget::Field => "fields_of_study",
        }
    }

    fn column_prefix(self) -> &'static str {
        match self {
            OverlayTarget::Area => "trait_",
            OverlayTarget::Field => "override_",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OverlayTarget::Area => "area",
            OverlayTarget::Field => "field",
        }
    }
}

/// File format of overlay files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayFormat {
    pub delimiter: u8,
    pub null_token: String,
    pub has_header: bool,
}

impl Default for OverlayFormat {
    fn default() -> Self {
        Self {
            delimiter: b';',
            null_token: "NULL".to_string(),
            has_header: true,
        }
    }
}

impl TryFrom<&IngestConfig> for OverlayFormat {
    type Error = tsf_common::Error;

    /// The delimiter must be a single ASCII character
    fn try_from(config: &IngestConfig) -> Result<Self, Self::Error> {
        let delimiter = config.overlay_delimiter;
        if !delimiter.is_ascii() {
            return Err(tsf_common::Error::Config(format!(
                "overlay_delimiter must be an ASCII character, got {:?}",
                delimiter
            )));
        }
        Ok(Self {
            delimiter: delimiter as u8,
            null_token: config.null_token.clone(),
            has_header: true,
        })
    }
}

/// One validated overlay row; scores in R, I, A, S, E, C order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRow {
    pub id: i64,
    pub scores: [Option<i64>; 6],
}

/// Parse and validate a complete overlay file
pub fn parse_overlay(
    bytes: &[u8],
    target: OverlayTarget,
    format: &OverlayFormat,
) -> IngestResult<Vec<OverlayRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(format.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let malformed = |line: u64, message: String| IngestError::MalformedOverlay {
        target: target.label(),
        line,
        message,
    };

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            malformed(line, e.to_string())
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != 7 {
            return Err(malformed(line, format!("expected 7 columns, found {}", record.len())));
        }

        let id = record[0]
            .parse::<i64>()
            .map_err(|_| malformed(line, format!("invalid id {:?}", &record[0])))?;

        let mut scores = [None; 6];
        for (slot, raw) in scores.iter_mut().zip(record.iter().skip(1)) {
            if raw.is_empty() || raw == format.null_token {
                continue;
            }
            let value = raw
                .parse::<i64>()
                .map_err(|_| malformed(line, format!("invalid score {:?}", raw)))?;
            if !(1..=5).contains(&value) {
                return Err(malformed(line, format!("score {} outside 1-5", value)));
            }
            *slot = Some(value);
        }

        rows.push(OverlayRow { id, scores });
    }

    Ok(rows)
}

/// Stage `rows` and apply them to the target table
pub async fn apply_overlay(
    tx: &mut Transaction<'_, Sqlite>,
    target: OverlayTarget,
    rows: &[OverlayRow],
) -> IngestResult<OverlayReport> {
    let table = target.table();
    let p = target.column_prefix();

    sqlx::query(&format!("DROP TABLE IF EXISTS temp.{STAGING_TABLE}"))
        .execute(&mut **tx)
        .await?;
    sqlx::query(&format!(
        r#"
        CREATE TEMP TABLE {STAGING_TABLE} (
            id INTEGER PRIMARY KEY,
            r INTEGER, i INTEGER, a INTEGER, s INTEGER, e INTEGER, c INTEGER
        )
        "#
    ))
    .execute(&mut **tx)
    .await?;

    // Later rows for the same id win
    let insert = format!(
        "INSERT OR REPLACE INTO {STAGING_TABLE} (id, r, i, a, s, e, c) VALUES (?, ?, ?, ?, ?, ?, ?)"
    );
    for row in rows {
        let [r, i, a, s, e, c] = row.scores;
        sqlx::query(&insert)
            .bind(row.id)
            .bind(r)
            .bind(i)
            .bind(a)
            .bind(s)
            .bind(e)
            .bind(c)
            .execute(&mut **tx)
            .await?;
    }

    let dropped: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {STAGING_TABLE} s WHERE NOT EXISTS (SELECT 1 FROM {table} t WHERE t.id = s.id)"
    ))
    .fetch_one(&mut **tx)
    .await?;

    let applied = sqlx::query(&format!(
        r#"
        UPDATE {table} SET
            {p}r = s.r, {p}i = s.i, {p}a = s.a, {p}s = s.s, {p}e = s.e, {p}c = s.c
        FROM {STAGING_TABLE} AS s
        WHERE {table}.id = s.id
        "#
    ))
    .execute(&mut **tx)
    .await?
    .rows_affected();

    sqlx::query(&format!("DROP TABLE temp.{STAGING_TABLE}"))
        .execute(&mut **tx)
        .await?;

    let report = OverlayReport {
        target: target.label().to_string(),
        rows_read: rows.len(),
        rows_applied: applied as usize,
        rows_dropped: dropped as usize,
    };

    if report.rows_dropped > 0 {
        warn!(
            target_table = table,
            dropped = report.rows_dropped,
            "Overlay rows reference unknown ids and were dropped"
        );
    }
    info!(
        target_table = table,
        read = report.rows_read,
        applied = report.rows_applied,
        "Overlay applied"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_null_tokens() {
        let csv = "id;R;I;A;S;E;C\n1;3;4;NULL;2;5;1\n2;NULL;NULL;NULL;NULL;NULL;NULL\n";
        let rows = parse_overlay(csv.as_bytes(), OverlayTarget::Field, &OverlayFormat::default()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].scores, [Some(3), Some(4), None, Some(2), Some(5), Some(1)]);
        assert_eq!(rows[1].scores, [None; 6]);
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let csv = "id;R;I;A;S;E;C\n1;3;4;9;2;5;1\n";
        let result = parse_overlay(csv.as_bytes(), OverlayTarget::Area, &OverlayFormat::default());
        assert!(matches!(
            result,
            Err(IngestError::MalformedOverlay { line: 2, .. })
        ));
    }

    #[test]
    fn test_wrong_column_count_rejected() {
        let csv = "id;R;I;A;S;E;C\n1;3;4;2\n";
        let result = parse_overlay(csv.as_bytes(), OverlayTarget::Area, &OverlayFormat::default());
        assert!(matches!(result, Err(IngestError::MalformedOverlay { .. })));
    }

    #[test]
    fn test_non_numeric_id_rejected() {
        let csv = "id;R;I;A;S;E;C\nabc;1;1;1;1;1;1\n";
        let result = parse_overlay(csv.as_bytes(), OverlayTarget::Area, &OverlayFormat::default());
        assert!(matches!(result, Err(IngestError::MalformedOverlay { .. })));
    }

    #[test]
    fn test_custom_delimiter_from_config() {
        let config = IngestConfig {
            overlay_delimiter: ',',
            null_token: "-".to_string(),
            ..Default::default()
        };
        let format = OverlayFormat::try_from(&config).unwrap();
        let rows = parse_overlay(b"id,R,I,A,S,E,C\n7,1,2,3,4,5,-\n", OverlayTarget::Area, &format).unwrap();
        assert_eq!(rows[0].scores[5], None);
        assert_eq!(rows[0].scores[4], Some(5));
    }

    #[test]
    fn test_non_ascii_delimiter_is_config_error() {
        let config = IngestConfig {
            overlay_delimiter: '§',
            ..Default::default()
        };
        assert!(matches!(
            OverlayFormat::try_from(&config),
            Err(tsf_common::Error::Config(_))
        ));
    }
}
