//! Flat records extracted from the catalog feeds
//!
//! Naming follows the relational model rather than the feed: a programme's
//! `<discipline>` elements carry the link to an area of study and become
//! [`FieldRecord`]s, while its `<field_of_study>` elements are finer
//! specialisations and become disciplines.

use serde::{Deserialize, Serialize};

use super::element::Element;

/// `(id, name)` reference entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionRecord {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub homepage: Option<String>,
    pub email: Option<String>,
    pub logo: Option<String>,
    pub foundation_year: Option<i64>,
    pub award_phd: bool,
    pub award_habilitation: bool,
    pub university_clinic: bool,
    pub institution_type: Option<NamedEntity>,
    pub institutional_control: Option<NamedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRecord {
    pub name: Option<String>,
    pub term: Option<String>,
    pub deadline_type: Option<String>,
    pub begins: Option<String>,
    pub ends: Option<String>,
    pub comment: Option<String>,
}

/// Field of study with its owning area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: i64,
    pub name: Option<String>,
    pub area: Option<NamedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    pub id: i64,
    pub name: Option<String>,
    pub is_main: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeRecord {
    pub id: i64,
    pub programme_type: Option<String>,
    pub name: Option<String>,
    pub institution_id: Option<i64>,
    pub degree: Option<NamedEntity>,
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
    pub deadlines: Vec<DeadlineRecord>,
    pub fields: Vec<FieldRecord>,
    pub disciplines: Vec<NamedEntity>,
    pub study_modes: Vec<NamedEntity>,
    pub languages: Vec<LanguageRecord>,
    pub locations: Vec<NamedEntity>,
}

/// Reference entity from `<tag id="..."><name lang="...">`; requires an id
fn named_entity(element: &Element, lang: &str) -> Option<NamedEntity> {
    Some(NamedEntity {
        id: element.int_value("id")?,
        name: element.localized("name", lang),
    })
}

/// Phone/fax numbers are split into a `prefix` attribute and the number text
fn phone_number(element: Option<&Element>) -> Option<String> {
    let element = element?;
    let full = format!(
        "{}{}",
        element.attr("prefix").unwrap_or_default(),
        element.text().unwrap_or_default()
    );
    let full = full.trim();
    if full.is_empty() {
        None
    } else {
        Some(full.to_string())
    }
}

impl InstitutionRecord {
    /// `None` when the element has no usable id
    pub fn from_element(e: &Element, lang: &str) -> Option<Self> {
        Some(Self {
            id: e.int_value("id")?,
            name: e.localized("name", lang),
            short_name: e.value("shortname"),
            state: e.localized_name("state", lang),
            city: e.child("city").and_then(|c| c.value("name")),
            phone: phone_number(e.child("phone")),
            fax: phone_number(e.child("fax")),
            homepage: e.value("homepage"),
            email: e.value("e_mail"),
            logo: e.value("logo"),
            foundation_year: e.int_value("foundation_year"),
            award_phd: e.child("award_phd").is_some_and(|c| c.flag("possible")),
            award_habilitation: e.child("award_habil").is_some_and(|c| c.flag("possible")),
            university_clinic: e.child("clinic").is_some_and(|c| c.flag("possible")),
            institution_type: e
                .child("institution_type")
                .and_then(|c| named_entity(c, lang)),
            institutional_control: e
                .child("institutional_control")
                .and_then(|c| named_entity(c, lang)),
        })
    }
}

impl ProgrammeRecord {
    /// `None` when the element has no usable id
    pub fn from_element(e: &Element, lang: &str) -> Option<Self> {
        let id = e.int_value("id")?;

        let deadlines = e
            .items("deadlines", "deadline")
            .into_iter()
            .map(|d| DeadlineRecord {
                name: d.value("name"),
                term: d.value("term"),
                deadline_type: d.value("type"),
                begins: d.value("begin"),
                ends: d.value("end"),
                comment: d.localized_name("comment", lang),
            })
            .collect();

        let fields = e
            .items("disciplines", "discipline")
            .into_iter()
            .filter_map(|d| {
                Some(FieldRecord {
                    id: d.int_value("id")?,
                    name: d.localized("name", lang),
                    area: d.child("area_of_study").and_then(|a| named_entity(a, lang)),
                })
            })
            .collect();

        let languages = e
            .items("teaching_languages", "teaching_language")
            .into_iter()
            .filter_map(|l| {
                Some(LanguageRecord {
                    id: l.int_value("id")?,
                    name: l.localized("name", lang),
                    is_main: l.flag("isMain"),
                })
            })
            .collect();

        let entities = |container: &str, item: &str| -> Vec<NamedEntity> {
            e.items(container, item)
                .into_iter()
                .filter_map(|x| named_entity(x, lang))
                .collect()
        };

        Some(Self {
            id,
            programme_type: e.value("type"),
            name: e.localized_name("subject", lang),
            institution_id: e.child("institution").and_then(|i| i.int_value("id")),
            degree: e.child("degree").and_then(|d| named_entity(d, lang)),
            fee: e.localized_name("fee", lang),
            fee_comment: e
                .child("fee")
                .and_then(|f| f.localized_name("comment", lang)),
            accredited: e.child("accreditation").is_some_and(|a| a.flag("accredited")),
            homepage: e.value("homepage"),
            comment: e.localized_name("comment", lang),
            internal_degree: e.localized_name("internalDegree", lang),
            master_type: e.localized_name("master_type", lang),
            teaching_degrees: e.child("teachingdegrees").is_some_and(|t| t.flag("possible")),
            duration: e.localized_name("duration", lang),
            target_group: e.localized_name("target_group", lang),
            admission_term: e.localized_name("admission_term", lang),
            admission_mode: e.localized_name("admission_mode", lang),
            admission_requirement: e.localized_name("admission_requirement", lang),
            admission_link: e.value("admission_link"),
            deadlines,
            fields,
            disciplines: entities("fields_of_study", "field_of_study"),
            study_modes: entities("modes_of_study", "mode_of_study"),
            languages,
            locations: entities("locations", "location"),
        })
    }
}
