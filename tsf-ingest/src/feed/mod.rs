//! Catalog feed parser
//!
//! Turns the institutions and degree programme documents into flat records.
//! Both feeds share the layout `<root><delivery><record/>*</delivery>*</root>`.
//! A document whose root does not match the expected feed, or which carries
//! no record at all, is rejected before anything is written.

pub mod element;
pub mod records;

pub use element::Element;
pub use records::{
    DeadlineRecord, FieldRecord, InstitutionRecord, LanguageRecord, NamedEntity, ProgrammeRecord,
};

use tracing::{debug, info, warn};

use crate::error::{IngestError, IngestResult};
use crate::models::ImportIssue;

/// Expected document schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Institutions,
    DegreeProgrammes,
}

impl FeedKind {
    pub fn root_element(self) -> &'static str {
        match self {
            FeedKind::Institutions => "institutions",
            FeedKind::DegreeProgrammes => "degreeProgrammes",
        }
    }

    pub fn record_element(self) -> &'static str {
        match self {
            FeedKind::Institutions => "institution",
            FeedKind::DegreeProgrammes => "degreeProgramme",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeedKind::Institutions => "institutions",
            FeedKind::DegreeProgrammes => "degree programmes",
        }
    }
}

/// Records extracted from one feed document
#[derive(Debug, Clone)]
pub struct ParsedFeed<T> {
    pub records: Vec<T>,
    /// Record elements without a usable id
    pub skipped: usize,
    pub issues: Vec<ImportIssue>,
}

/// Validate the root and return every record element in document order
fn record_elements<'a>(root: &'a Element, kind: FeedKind) -> IngestResult<Vec<&'a Element>> {
    if root.name != kind.root_element() {
        return Err(IngestError::MalformedFeed {
            feed: kind.label(),
            message: format!(
                "expected root <{}>, found <{}>",
                kind.root_element(),
                root.name
            ),
        });
    }

    let elements = root.items("delivery", kind.record_element());
    if elements.is_empty() {
        return Err(IngestError::MalformedFeed {
            feed: kind.label(),
            message: format!("no <{}> records found", kind.record_element()),
        });
    }

    info!("{} {} records found", elements.len(), kind.label());
    Ok(elements)
}

fn parse_feed<T>(
    bytes: &[u8],
    kind: FeedKind,
    extract: impl Fn(&Element) -> Option<T>,
) -> IngestResult<ParsedFeed<T>> {
    let root = Element::parse(bytes).map_err(|message| IngestError::MalformedFeed {
        feed: kind.label(),
        message,
    })?;

    let mut parsed = ParsedFeed {
        records: Vec::new(),
        skipped: 0,
        issues: Vec::new(),
    };

    for (position, element) in record_elements(&root, kind)?.into_iter().enumerate() {
        match extract(element) {
            Some(record) => parsed.records.push(record),
            None => {
                debug!("Skipping {} record #{} without id", kind.label(), position + 1);
                parsed.skipped += 1;
                parsed.issues.push(ImportIssue::skip(
                    "MISSING_ID",
                    format!("{} record #{} has no usable id", kind.label(), position + 1),
                    None,
                ));
            }
        }
    }

    if parsed.skipped > 0 {
        warn!("Skipped {} {} records without id", parsed.skipped, kind.label());
    }

    Ok(parsed)
}

/// Parse an institutions document
pub fn parse_institutions(bytes: &[u8], lang: &str) -> IngestResult<ParsedFeed<InstitutionRecord>> {
    parse_feed(bytes, FeedKind::Institutions, |e| {
        InstitutionRecord::from_element(e, lang)
    })
}

/// Parse a degree programmes document
pub fn parse_programmes(bytes: &[u8], lang: &str) -> IngestResult<ParsedFeed<ProgrammeRecord>> {
    parse_feed(bytes, FeedKind::DegreeProgrammes, |e| {
        ProgrammeRecord::from_element(e, lang)
    })
}
