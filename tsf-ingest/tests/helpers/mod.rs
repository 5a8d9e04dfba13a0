//! Test Helper Utilities
//!
//! Shared utilities for testing tsf-ingest

pub mod db_utils;

pub use db_utils::{
    aggregate_rows, count_rows, create_test_db, fixture, fixture_inputs, AggregateRow,
};
