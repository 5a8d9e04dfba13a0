//! tsf-ingest library
//!
//! Catalog refresh pipeline: feed parsing, relational loading, trait overlays,
//! consistency gate and programme aggregate rebuild.

pub mod aggregate;
pub mod error;
pub mod feed;
pub mod gate;
pub mod loader;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod questions;

pub use crate::error::{IngestError, IngestResult};
pub use crate::models::RefreshReport;
pub use crate::pipeline::{run_refresh, RefreshInputs, RefreshOptions, RefreshPaths};
