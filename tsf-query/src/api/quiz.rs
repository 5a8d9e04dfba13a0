//! Quiz endpoints: candidate filtering, questions and programme lookups

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::debug;
use tsf_common::api::{
    BulkProgrammesRequest, FilterAnswer, FilterRequest, FilterResponse, ProgrammesResponse,
    QuestionsResponse, TraitAnswer,
};

use super::ApiJson;
use crate::db::programmes::ProgrammeDetail;
use crate::db::{filter as filter_db, programmes, questions};
use crate::error::{ApiError, ApiResult};
use crate::matching;
use crate::AppState;

/// Level-1 answer meaning "no preference"
pub const NO_PREFERENCE: &str = "all";

/// Level-1 programme type filter; `None` selects every programme
fn programme_type_filter(answers: &[FilterAnswer]) -> Option<&str> {
    answers
        .iter()
        .find_map(|a| match a {
            FilterAnswer::Categorical { studientyp } => Some(studientyp.trim()),
            FilterAnswer::Trait(_) => None,
        })
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(NO_PREFERENCE))
}

/// POST /api/quiz/filter
pub async fn filter(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilterRequest>,
) -> ApiResult<Json<FilterResponse>> {
    let ids = match request.level {
        1 => {
            let programme_type = programme_type_filter(&request.answers);
            filter_db::programme_ids(&state.db, programme_type).await?
        }
        2 => {
            let answers: Vec<TraitAnswer> = request
                .answers
                .iter()
                .filter_map(|a| match a {
                    FilterAnswer::Trait(t) => Some(t.clone()),
                    FilterAnswer::Categorical { .. } => None,
                })
                .collect();
            let user_traits = matching::user_top_traits(&answers);
            let candidates = request.study_programme_ids.unwrap_or_default();

            let vectors = filter_db::candidate_vectors(&state.db, &candidates).await?;
            matching::rank_matches(&vectors, &user_traits, state.config.level2_result_limit)
        }
        other => {
            return Err(ApiError::BadRequest(format!("Unsupported quiz level {}", other)));
        }
    };

    debug!(level = request.level, matches = ids.len(), "Filter request served");
    Ok(Json(FilterResponse { success: true, ids }))
}

/// GET /api/quiz/level/:level
pub async fn get_questions(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> ApiResult<Json<QuestionsResponse>> {
    let level: u8 = level
        .parse()
        .map_err(|_| ApiError::BadRequest("level must be a number".to_string()))?;

    if level != 2 {
        return Err(ApiError::NotFound(format!("No questions for level {}", level)));
    }

    Ok(Json(QuestionsResponse {
        message: "Questions retrieved successfully".to_string(),
        questions: questions::list(&state.db).await?,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeResponse {
    pub success: bool,
    pub study_programme: Option<ProgrammeDetail>,
}

/// GET /api/quiz/study-programme/:id
///
/// An unknown id is a normal answer with `studyProgramme: null`.
pub async fn get_programme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProgrammeResponse>> {
    Ok(Json(ProgrammeResponse {
        success: true,
        study_programme: programmes::get_programme(&state.db, id).await?,
    }))
}

/// POST /api/quiz/study-programmes/bulk
pub async fn bulk_programmes(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkProgrammesRequest>,
) -> ApiResult<Json<ProgrammesResponse>> {
    Ok(Json(ProgrammesResponse {
        success: true,
        study_programmes: programmes::get_summaries(&state.db, &request.ids).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorical(t: &str) -> FilterAnswer {
        FilterAnswer::Categorical {
            studientyp: t.to_string(),
        }
    }

    #[test]
    fn test_no_preference_answers() {
        assert_eq!(programme_type_filter(&[]), None);
        assert_eq!(programme_type_filter(&[categorical("")]), None);
        assert_eq!(programme_type_filter(&[categorical("all")]), None);
        assert_eq!(programme_type_filter(&[categorical("ALL")]), None);
    }

    #[test]
    fn test_programme_type_answer() {
        assert_eq!(
            programme_type_filter(&[categorical(" grundständig ")]),
            Some("grundständig")
        );
    }
}
