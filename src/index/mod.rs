//! Vector index abstraction and implementations.
//!
//! The query service only needs one thing from an index: the k stored vectors
//! nearest to a query vector, as (identifier, distance) pairs ordered nearest
//! first. How the index finds them is the library's business.

pub mod hnsw;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when loading or querying a vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The on-disk index could not be read
    #[error("Failed to load index: {0}")]
    LoadError(String),

    /// Query vector length does not match the indexed vectors
    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// One hit from a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Identifier the vector was inserted with (a record store row)
    pub id: usize,

    /// Distance to the query vector
    pub distance: f32,
}

impl Neighbor {
    pub fn new(id: usize, distance: f32) -> Self {
        Self { id, distance }
    }
}

/// Read-only approximate nearest-neighbor index.
///
/// Implementations must be safe to query from several tasks at once; nothing
/// in this crate mutates an index after it is loaded.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` neighbors of `vector`, nearest first.
    ///
    /// # Errors
    /// Returns `IndexError::DimensionMismatch` if `vector` has the wrong length
    fn nearest(&self, vector: &[f32], k: usize) -> IndexResult<Vec<Neighbor>>;

    /// Number of vectors stored in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
