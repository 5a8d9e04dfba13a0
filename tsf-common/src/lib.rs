//! # Tech Study Finder Common Library
//!
//! Shared code for the ingest pipeline, the query service and the quiz client:
//! - Error type
//! - Configuration loading and root folder resolution
//! - RIASEC trait types and the shared ranking rule
//! - HTTP request/response types
//! - Database schema initialization and row models (feature `sqlx`)

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod riasec;

pub use error::{Error, Result};
pub use riasec::{Trait, TraitTotals, TraitVector};
