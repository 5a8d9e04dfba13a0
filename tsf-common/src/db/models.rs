//! Database models

use serde::{Deserialize, Serialize};

/// Degree programme row joined with its degree and institution names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Programme {
    pub id: i64,
    pub programme_type: Option<String>,
    pub name: Option<String>,
    pub institution_id: i64,
    pub institution_name: Option<String>,
    pub city: Option<String>,
    pub degree_id: Option<i64>,
    pub degree_name: Option<String>,
    pub fee: Option<String>,
    pub fee_comment: Option<String>,
    pub accredited: bool,
    pub homepage: Option<String>,
    pub comment: Option<String>,
    pub internal_degree: Option<String>,
    pub master_type: Option<String>,
    pub teaching_degrees: bool,
    pub duration: Option<String>,
    pub target_group: Option<String>,
    pub admission_term: Option<String>,
    pub admission_mode: Option<String>,
    pub admission_requirement: Option<String>,
    pub admission_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Deadline {
    pub name: Option<String>,
    pub term: Option<String>,
    pub deadline_type: Option<String>,
    pub begins: Option<String>,
    pub ends: Option<String>,
    pub comment: Option<String>,
}

/// Named entity linked to a programme (discipline, field, mode, language, location)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NamedRef {
    pub id: i64,
    pub name: Option<String>,
}

/// Optional six-trait score set as stored in the area and field tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitScores {
    pub r: Option<i64>,
    pub i: Option<i64>,
    pub a: Option<i64>,
    pub s: Option<i64>,
    pub e: Option<i64>,
    pub c: Option<i64>,
}

impl TraitScores {
    pub fn as_array(&self) -> [Option<i64>; 6] {
        [self.r, self.i, self.a, self.s, self.e, self.c]
    }

    /// All six scores present
    pub fn is_complete(&self) -> bool {
        self.as_array().iter().all(Option::is_some)
    }

    /// Some but not all scores present
    pub fn is_partial(&self) -> bool {
        let present = self.as_array().iter().filter(|v| v.is_some()).count();
        present > 0 && present < 6
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaOfStudy {
    pub id: i64,
    pub name: Option<String>,
    pub scores: TraitScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOfStudy {
    pub id: i64,
    pub name: Option<String>,
    pub area_id: Option<i64>,
    pub score_override: TraitScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_scores_completeness() {
        let empty = TraitScores::default();
        assert!(!empty.is_complete());
        assert!(!empty.is_partial());

        let partial = TraitScores {
            r: Some(3),
            i: Some(4),
            ..Default::default()
        };
        assert!(partial.is_partial());

        let full = TraitScores {
            r: Some(1),
            i: Some(2),
            a: Some(3),
            s: Some(4),
            e: Some(5),
            c: Some(1),
        };
        assert!(full.is_complete());
        assert!(!full.is_partial());
    }
}
