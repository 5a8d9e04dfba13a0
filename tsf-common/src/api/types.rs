//! Shared API request/response types
//!
//! Field names on the wire are camelCase except where existing clients rely
//! on another spelling (`studientyp`, `riasec_type`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::riasec::Trait;

// ========================================
// Quiz filter
// ========================================

/// Body of `POST /api/quiz/filter`
///
/// Level 1 carries at most one categorical answer:
///
/// ```
/// use tsf_common::api::FilterRequest;
///
/// let req: FilterRequest =
///     serde_json::from_str(r#"{"level":1,"answers":[{"studientyp":"grundständig"}]}"#).unwrap();
/// assert_eq!(req.level, 1);
/// ```
///
/// Level 2 carries the user's strongest traits and the Level-1 candidates:
///
/// ```
/// use tsf_common::api::FilterRequest;
///
/// let req: FilterRequest = serde_json::from_str(
///     r#"{"level":2,"answers":[{"type":"E","score":5}],"studyProgrammeIds":[11,12]}"#,
/// ).unwrap();
/// assert_eq!(req.study_programme_ids, Some(vec![11, 12]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    pub level: u8,

    #[serde(default)]
    pub answers: Vec<FilterAnswer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_programme_ids: Option<Vec<i64>>,
}

impl FilterRequest {
    /// Level-1 request; `None` asks for the full candidate set
    pub fn level1(programme_type: Option<&str>) -> Self {
        Self {
            level: 1,
            answers: programme_type
                .map(|t| {
                    vec![FilterAnswer::Categorical {
                        studientyp: t.to_string(),
                    }]
                })
                .unwrap_or_default(),
            study_programme_ids: None,
        }
    }

    /// Level-2 request from ranked trait totals and the Level-1 candidates
    pub fn level2(top_traits: &[(Trait, i32)], candidates: &[i64]) -> Self {
        Self {
            level: 2,
            answers: top_traits
                .iter()
                .map(|(t, score)| {
                    FilterAnswer::Trait(TraitAnswer {
                        riasec_type: *t,
                        score: f64::from(*score),
                    })
                })
                .collect(),
            study_programme_ids: Some(candidates.to_vec()),
        }
    }
}

/// One entry of `FilterRequest::answers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterAnswer {
    /// Level-1 programme type choice
    Categorical { studientyp: String },
    /// Level-2 ranked trait
    Trait(TraitAnswer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitAnswer {
    #[serde(rename = "type")]
    pub riasec_type: Trait,
    pub score: f64,
}

/// Response of `POST /api/quiz/filter`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResponse {
    pub success: bool,
    pub ids: Vec<i64>,
}

// ========================================
// Questions and programmes
// ========================================

/// Level-2 question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub text: String,
    pub riasec_type: Trait,
}

/// Response of `GET /api/quiz/level/{level}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub message: String,
    pub questions: Vec<QuizQuestion>,
}

/// Body of `POST /api/quiz/study-programmes/bulk`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkProgrammesRequest {
    pub ids: Vec<i64>,
}

/// Short programme listing used by result screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeSummary {
    pub id: i64,
    pub name: Option<String>,
    pub programme_type: Option<String>,
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub city: Option<String>,
}

/// Response of `POST /api/quiz/study-programmes/bulk`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammesResponse {
    pub success: bool,
    pub study_programmes: Vec<ProgrammeSummary>,
}

// ========================================
// Favorites, reconciliation and stored results
// ========================================

/// Body of `POST /api/accounts/{account}/favorites`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub study_programme_id: i64,
}

/// Response of `GET /api/accounts/{account}/favorites`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesResponse {
    pub success: bool,
    pub favorites: Vec<i64>,
}

/// Body of `POST /api/accounts/{account}/reconcile`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub result_ids: Vec<i64>,
}

/// Outcome of attaching guest results to an account.
///
/// Every requested id lands in exactly one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub attached: Vec<i64>,
    pub already_present: Vec<i64>,
    pub failed: Vec<i64>,
}

/// Body of `PUT /api/accounts/{account}/results`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultsRequest {
    pub result_ids: Vec<i64>,
}

/// Response of `GET /api/accounts/{account}/results`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultsResponse {
    pub success: bool,
    pub result_ids: Vec<i64>,
    pub updated_at: DateTime<Utc>,
}

// ========================================
// Errors
// ========================================

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
