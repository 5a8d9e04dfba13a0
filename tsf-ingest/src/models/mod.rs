//! Data models for tsf-ingest
//!
//! - Refresh state machine
//! - Per-stage reports and collected warnings

pub mod refresh_session;
pub mod report;

pub use refresh_session::{RefreshSession, RefreshState, StateTransition};
pub use report::{
    AggregateReport, ErrorSeverity, GateReport, ImportIssue, LoadReport, OverlayReport,
    QuestionReport, RefreshReport,
};
