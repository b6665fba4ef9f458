//! Core data models for the paper recommender.
//!
//! This module contains the data structures shared by the record store, the
//! query service and the presentation layers: paper records, per-query results
//! and the summary shown after each search.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metadata for a single paper held by the record store.
///
/// Records are immutable once loaded. The `id` is the row position of the
/// paper in the record store file, which is also the identifier the vector
/// index was built with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Row position in the record store (0-based)
    pub id: usize,

    /// Paper title
    pub title: String,

    /// Abstract text
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Link to the paper
    pub url: String,
}

/// A single search hit: the matched record and its distance to the query.
///
/// Smaller distances are better. Results are kept in the order the vector
/// index returned them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// The matched paper
    pub record: Record,

    /// Distance between the query embedding and the paper embedding
    pub distance: f32,
}

impl QueryResult {
    /// Create a new query result from a record and its distance.
    pub fn new(record: Record, distance: f32) -> Self {
        Self { record, distance }
    }
}

/// Statistics about a completed search, rendered as the UI status line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSummary {
    /// Number of results returned
    pub result_count: usize,

    /// Wall-clock time spent embedding and searching
    pub elapsed: Duration,

    /// Number of papers in the record store
    pub corpus_size: usize,
}

impl SearchSummary {
    pub fn new(result_count: usize, elapsed: Duration, corpus_size: usize) -> Self {
        Self {
            result_count,
            elapsed,
            corpus_size,
        }
    }

    /// Elapsed time in fractional seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for SearchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} results in {:.2} seconds on database of {} papers.",
            self.result_count,
            self.elapsed_secs(),
            self.corpus_size
        )
    }
}
