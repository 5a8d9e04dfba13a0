//! Shared HTTP API types
//!
//! Request and response bodies exchanged between the quiz client and the
//! query service. Both sides compile against these definitions, so the wire
//! format is defined once.

pub mod types;

pub use types::{
    BulkProgrammesRequest, ErrorBody, ErrorDetail, FavoriteRequest, FavoritesResponse,
    FilterAnswer, FilterRequest, FilterResponse, ProgrammeSummary, ProgrammesResponse,
    QuestionsResponse, QuizQuestion, QuizResultsRequest, QuizResultsResponse, ReconcileReport,
    ReconcileRequest, TraitAnswer,
};
