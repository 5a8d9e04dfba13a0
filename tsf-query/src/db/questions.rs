//! Level-2 question bank

use sqlx::SqlitePool;
use tsf_common::api::QuizQuestion;
use tsf_common::{Error, Result, Trait};

/// Every question in id order
pub async fn list(pool: &SqlitePool) -> Result<Vec<QuizQuestion>> {
    let rows: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, text, trait FROM quiz_questions ORDER BY id")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(id, text, code)| {
            let riasec_type = code
                .parse::<Trait>()
                .map_err(|e| Error::Internal(format!("Question {}: {}", id, e)))?;
            Ok(QuizQuestion {
                id,
                text,
                riasec_type,
            })
        })
        .collect()
}
