//! Level-2 question bank import
//!
//! The question file is comma-delimited without a header: `id, text, trait`.
//! Loading replaces the whole bank.

use sqlx::{Sqlite, Transaction};
use tracing::info;
use tsf_common::api::QuizQuestion;
use tsf_common::Trait;

use crate::error::{IngestError, IngestResult};
use crate::models::QuestionReport;

/// Parse and validate a complete question file
pub fn parse_questions(bytes: &[u8]) -> IngestResult<Vec<QuizQuestion>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut questions = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IngestError::MalformedQuestion {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |message: String| IngestError::MalformedQuestion { line, message };

        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != 3 {
            return Err(malformed(format!("expected 3 columns, found {}", record.len())));
        }

        let id = record[0]
            .parse::<i64>()
            .map_err(|_| malformed(format!("invalid id {:?}", &record[0])))?;
        let text = record[1].to_string();
        if text.is_empty() {
            return Err(malformed("empty question text".to_string()));
        }
        let riasec_type = record[2]
            .parse::<Trait>()
            .map_err(|e| malformed(e.to_string()))?;

        questions.push(QuizQuestion {
            id,
            text,
            riasec_type,
        });
    }

    Ok(questions)
}

/// Replace the question bank
pub async fn load_questions(
    tx: &mut Transaction<'_, Sqlite>,
    questions: &[QuizQuestion],
) -> IngestResult<QuestionReport> {
    sqlx::query("DELETE FROM quiz_questions")
        .execute(&mut **tx)
        .await?;

    for question in questions {
        sqlx::query("INSERT OR REPLACE INTO quiz_questions (id, text, trait) VALUES (?, ?, ?)")
            .bind(question.id)
            .bind(&question.text)
            .bind(question.riasec_type.code())
            .execute(&mut **tx)
            .await?;
    }

    let loaded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions")
        .fetch_one(&mut **tx)
        .await?;

    info!(questions = loaded, "Question bank loaded");
    Ok(QuestionReport {
        questions_loaded: loaded as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions() {
        let csv = "1,Ich repariere gerne Dinge,R\n2,\"Ich analysiere Daten, gern auch lange\",I\n";
        let questions = parse_questions(csv.as_bytes()).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].riasec_type, Trait::Realistic);
        assert_eq!(questions[1].text, "Ich analysiere Daten, gern auch lange");
    }

    #[test]
    fn test_unknown_trait_rejected() {
        let result = parse_questions(b"1,Frage,X\n");
        assert!(matches!(result, Err(IngestError::MalformedQuestion { line: 1, .. })));
    }
}
