//! Paper Recommender - semantic search over academic paper abstracts.
//!
//! A query string is embedded with a sentence-transformer model, the nearest
//! abstracts are found in a prebuilt HNSW vector index, and the hits are joined
//! against an in-memory table of paper metadata.
//!
//! # Architecture
//!
//! - **models**: Core data structures (Record, QueryResult, SearchSummary)
//! - **embedding**: Text embedding providers (fastembed)
//! - **index**: Vector index abstraction and the HNSW implementation
//! - **records**: CSV-backed record store
//! - **query**: The query service joining the three together
//! - **config**: Command-line / environment configuration
//! - **startup**: Load-once construction of the shared resources
//! - **server**: Browser UI and JSON API
//!
//! # Workflow
//!
//! 1. Load the record store, the embedding model and the vector index once
//! 2. Embed each query
//! 3. Ask the index for the `k` nearest abstracts
//! 4. Resolve every hit to its record, keeping the index order
//!
//! The index and the record store are built offline from the same corpus
//! snapshot; this crate never writes either.

pub mod config;
pub mod embedding;
pub mod index;
pub mod models;
pub mod query;
pub mod records;
pub mod server;
pub mod startup;

// Re-export commonly used types at the crate root
pub use embedding::EmbeddingProvider;
pub use index::{Neighbor, VectorIndex};
pub use models::{QueryResult, Record, SearchSummary};
pub use query::{QueryError, QueryService, SearchEngine, SearchQuery};
pub use records::RecordStore;

/// Number of results shown when the user has not picked one
pub const DEFAULT_TOP_K: usize = 3;

/// Largest number of results the UI offers
pub const MAX_TOP_K: usize = 10;
