//! Query service.
//!
//! This module turns a query string into ranked paper records. It coordinates
//! the embedding provider, the vector index and the record store:
//!
//! 1. Embed the query text
//! 2. Ask the index for the `k` nearest vectors
//! 3. Join each returned identifier against the record store
//!
//! Results keep the order the index returned them in (nearest first); the
//! service does not re-rank.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paper_recommender::embedding::fastembed::{FastEmbedProvider, ModelChoice};
//! use paper_recommender::index::hnsw::HnswIndex;
//! use paper_recommender::query::{QueryService, SearchEngine, SearchQuery};
//! use paper_recommender::records::RecordStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = Arc::new(FastEmbedProvider::new(ModelChoice::Mpnet, None)?);
//! let index: Arc<HnswIndex> = Arc::new(HnswIndex::load(".".as_ref(), "index", 768, 64)?);
//! let records = Arc::new(RecordStore::from_csv_path("arxiv_processed.csv".as_ref())?);
//!
//! let service = QueryService::new(embedder, index, records);
//! let results = service.search(&SearchQuery::new("graph neural networks", 3)).await?;
//!
//! for result in results {
//!     println!("{:.4} {}", result.distance, result.record.title);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::index::{IndexError, VectorIndex};
use crate::models::{QueryResult, SearchSummary};
use crate::records::RecordStore;

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The embedding provider could not produce a vector
    #[error("Embedding provider failed: {0}")]
    ProviderError(#[from] EmbeddingError),

    /// The index returned an identifier with no matching record
    #[error("Index returned id {id} but the record store holds {records} records")]
    LookupError { id: usize, records: usize },

    /// The index rejected the query vector
    #[error("Vector index failed: {0}")]
    IndexError(#[from] IndexError),

    /// Invalid query parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type for query operations.
pub type QueryOutcome<T> = Result<T, QueryError>;

/// Search query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// The search query text, passed to the embedding provider unchanged
    pub query: String,

    /// Maximum number of results to return
    pub top_k: usize,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }
}

/// Trait for search engines.
///
/// Object safe so that servers can hold an `Arc<dyn SearchEngine>`.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Execute a search query.
    ///
    /// # Returns
    /// At most `query.top_k` results, nearest first
    ///
    /// # Errors
    /// Returns `QueryError` if the search fails; nothing is retried
    async fn search(&self, query: &SearchQuery) -> QueryOutcome<Vec<QueryResult>>;

    /// Number of papers searchable by this engine.
    fn corpus_size(&self) -> usize;

    /// Execute a search and time it.
    ///
    /// The elapsed time covers embedding, index lookup and the record join.
    async fn search_with_summary(
        &self,
        query: &SearchQuery,
    ) -> QueryOutcome<(Vec<QueryResult>, SearchSummary)> {
        let start = Instant::now();
        let results = self.search(query).await?;
        let summary = SearchSummary::new(results.len(), start.elapsed(), self.corpus_size());
        Ok((results, summary))
    }
}

/// Default search engine: embedding provider plus vector index plus record
/// store, each loaded once and shared.
pub struct QueryService<E, I>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    embedder: Arc<E>,
    index: Arc<I>,
    records: Arc<RecordStore>,
}

impl<E, I> QueryService<E, I>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    /// Create a new query service.
    ///
    /// # Arguments
    /// * `embedder` - Provider for query embeddings; must match the model the index was built with
    /// * `index` - Vector index over record embeddings
    /// * `records` - Record store whose row positions match the index identifiers
    pub fn new(embedder: Arc<E>, index: Arc<I>, records: Arc<RecordStore>) -> Self {
        Self {
            embedder,
            index,
            records,
        }
    }
}

#[async_trait]
impl<E, I> SearchEngine for QueryService<E, I>
where
    E: EmbeddingProvider,
    I: VectorIndex,
{
    async fn search(&self, query: &SearchQuery) -> QueryOutcome<Vec<QueryResult>> {
        if query.top_k == 0 {
            return Err(QueryError::InvalidQuery(
                "top_k must be at least 1".to_string(),
            ));
        }

        let embedding = self.embedder.embed(&query.query).await?;
        let neighbors = self.index.nearest(&embedding, query.top_k)?;
        debug!(
            "Index returned {} neighbors for query {:?}",
            neighbors.len(),
            query.query
        );

        neighbors
            .into_iter()
            .take(query.top_k)
            .map(|neighbor| match self.records.get(neighbor.id) {
                Some(record) => Ok(QueryResult::new(record.clone(), neighbor.distance)),
                None => {
                    warn!(
                        "Index/record store mismatch: id {} not in {} records",
                        neighbor.id,
                        self.records.len()
                    );
                    Err(QueryError::LookupError {
                        id: neighbor.id,
                        records: self.records.len(),
                    })
                }
            })
            .collect()
    }

    fn corpus_size(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexResult, Neighbor};
    use crate::models::Record;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Embeds the text length into a one-dimensional vector
    struct MockEmbeddingProvider {
        should_fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MockEmbeddingProvider {
        fn new() -> Self {
            Self {
                should_fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_failure() -> Self {
            Self {
                should_fail: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.lock().unwrap().push(text.to_string());
            if self.should_fail {
                return Err(EmbeddingError::InitError("no compute backend".to_string()));
            }
            Ok(vec![text.len() as f32])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }
    }

    // Returns canned neighbors regardless of the query vector
    struct FixedIndex {
        neighbors: Vec<Neighbor>,
    }

    impl FixedIndex {
        fn new(pairs: &[(usize, f32)]) -> Self {
            Self {
                neighbors: pairs.iter().map(|&(id, d)| Neighbor::new(id, d)).collect(),
            }
        }
    }

    impl VectorIndex for FixedIndex {
        fn nearest(&self, _vector: &[f32], k: usize) -> IndexResult<Vec<Neighbor>> {
            Ok(self.neighbors.iter().take(k).copied().collect())
        }

        fn len(&self) -> usize {
            self.neighbors.len()
        }
    }

    // Exact nearest neighbors over one-dimensional points
    struct LineIndex {
        points: HashMap<usize, f32>,
    }

    impl VectorIndex for LineIndex {
        fn nearest(&self, vector: &[f32], k: usize) -> IndexResult<Vec<Neighbor>> {
            if vector.len() != 1 {
                return Err(IndexError::DimensionMismatch {
                    expected: 1,
                    actual: vector.len(),
                });
            }
            let mut hits: Vec<Neighbor> = self
                .points
                .iter()
                .map(|(&id, &p)| Neighbor::new(id, (p - vector[0]).abs()))
                .collect();
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
            hits.truncate(k);
            Ok(hits)
        }

        fn len(&self) -> usize {
            self.points.len()
        }
    }

    fn create_record(title: &str) -> Record {
        Record {
            id: 0,
            title: title.to_string(),
            abstract_text: format!("Abstract of {}", title),
            url: format!("https://example.org/{}", title.replace(' ', "-")),
        }
    }

    fn three_papers() -> Arc<RecordStore> {
        Arc::new(RecordStore::new(vec![
            create_record("Paper A"),
            create_record("Paper B"),
            create_record("Paper C"),
        ]))
    }

    fn service_with<I: VectorIndex>(index: I) -> QueryService<MockEmbeddingProvider, I> {
        QueryService::new(
            Arc::new(MockEmbeddingProvider::new()),
            Arc::new(index),
            three_papers(),
        )
    }

    #[tokio::test]
    async fn test_joins_in_index_order() {
        let service = service_with(FixedIndex::new(&[(1, 0.1), (0, 0.3)]));

        let results = service
            .search(&SearchQuery::new("transformers", 2))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.title, "Paper B");
        assert_eq!(results[0].distance, 0.1);
        assert_eq!(results[1].record.title, "Paper A");
        assert_eq!(results[1].distance, 0.3);
    }

    #[tokio::test]
    async fn test_k_larger_than_index_is_not_padded() {
        let service = service_with(FixedIndex::new(&[(2, 0.05), (0, 0.2), (1, 0.4)]));

        let results = service.search(&SearchQuery::new("query", 5)).await.unwrap();

        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_id_is_lookup_error() {
        let service = service_with(FixedIndex::new(&[(0, 0.1), (99, 0.2)]));

        let result = service.search(&SearchQuery::new("query", 2)).await;

        match result {
            Err(QueryError::LookupError { id, records }) => {
                assert_eq!(id, 99);
                assert_eq!(records, 3);
            }
            other => panic!("Expected LookupError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let service = QueryService::new(
            Arc::new(MockEmbeddingProvider::with_failure()),
            Arc::new(FixedIndex::new(&[(0, 0.1)])),
            three_papers(),
        );

        let result = service.search(&SearchQuery::new("query", 1)).await;

        assert!(matches!(result, Err(QueryError::ProviderError(_))));
    }

    #[tokio::test]
    async fn test_index_error_propagates() {
        struct TwoDimIndex;
        impl VectorIndex for TwoDimIndex {
            fn nearest(&self, vector: &[f32], _k: usize) -> IndexResult<Vec<Neighbor>> {
                Err(IndexError::DimensionMismatch {
                    expected: 2,
                    actual: vector.len(),
                })
            }
            fn len(&self) -> usize {
                0
            }
        }

        let result = service_with(TwoDimIndex)
            .search(&SearchQuery::new("query", 1))
            .await;

        assert!(matches!(result, Err(QueryError::IndexError(_))));
    }

    #[tokio::test]
    async fn test_zero_k_is_rejected_before_embedding() {
        let embedder = Arc::new(MockEmbeddingProvider::new());
        let service = QueryService::new(
            Arc::clone(&embedder),
            Arc::new(FixedIndex::new(&[(0, 0.1)])),
            three_papers(),
        );

        let result = service.search(&SearchQuery::new("query", 0)).await;

        assert!(matches!(result, Err(QueryError::InvalidQuery(_))));
        assert!(embedder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_searched() {
        let embedder = Arc::new(MockEmbeddingProvider::new());
        let service = QueryService::new(
            Arc::clone(&embedder),
            Arc::new(FixedIndex::new(&[(0, 0.1)])),
            three_papers(),
        );

        let results = service.search(&SearchQuery::new("", 1)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(embedder.calls.lock().unwrap().as_slice(), &["".to_string()]);
    }

    #[tokio::test]
    async fn test_query_text_is_passed_unchanged() {
        let embedder = Arc::new(MockEmbeddingProvider::new());
        let service = QueryService::new(
            Arc::clone(&embedder),
            Arc::new(FixedIndex::new(&[(0, 0.1)])),
            three_papers(),
        );

        service
            .search(&SearchQuery::new("  Mixed CASE  ", 1))
            .await
            .unwrap();

        assert_eq!(
            embedder.calls.lock().unwrap().as_slice(),
            &["  Mixed CASE  ".to_string()]
        );
    }

    #[tokio::test]
    async fn test_results_bounded_and_sorted_for_all_k() {
        let points = (0..3).map(|id| (id, id as f32 * 4.0)).collect();
        let service = service_with(LineIndex { points });

        for k in 1..=10 {
            for query in ["", "a", "graph", "a much longer query string"] {
                let results = service.search(&SearchQuery::new(query, k)).await.unwrap();
                assert!(results.len() <= k);
                assert_eq!(results.len(), k.min(3));
                for pair in results.windows(2) {
                    assert!(pair[0].distance <= pair[1].distance);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_search_is_idempotent() {
        let points = (0..3).map(|id| (id, id as f32 * 3.0)).collect();
        let service = service_with(LineIndex { points });
        let query = SearchQuery::new("reinforcement learning", 3);

        let first = service.search(&query).await.unwrap();
        let second = service.search(&query).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_search_with_summary() {
        let service = service_with(FixedIndex::new(&[(1, 0.1), (0, 0.3)]));

        let (results, summary) = service
            .search_with_summary(&SearchQuery::new("query", 2))
            .await
            .unwrap();

        assert_eq!(summary.result_count, results.len());
        assert_eq!(summary.corpus_size, 3);
        assert!(summary.to_string().starts_with("Found 2 results in "));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let engine: Arc<dyn SearchEngine> = Arc::new(service_with(FixedIndex::new(&[(2, 0.0)])));

        let results = engine.search(&SearchQuery::new("query", 1)).await.unwrap();

        assert_eq!(results[0].record.title, "Paper C");
        assert_eq!(engine.corpus_size(), 3);
    }
}
