//! Startup load phase.
//!
//! Loads the record store, the embedding model and the vector index once and
//! hands them out as explicit, shared dependency objects. Nothing here is
//! cached globally; callers keep the returned [`Resources`] for as long as
//! they serve queries.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::embedding::fastembed::FastEmbedProvider;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::index::hnsw::HnswIndex;
use crate::index::{IndexError, VectorIndex};
use crate::query::QueryService;
use crate::records::{RecordStore, RecordStoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load record store: {0}")]
    Records(#[from] RecordStoreError),

    #[error("Failed to load embedding model: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Failed to load vector index: {0}")]
    Index(#[from] IndexError),

    #[error("Record store is empty: {0}")]
    EmptyRecordStore(String),
}

pub type StartupResult<T> = Result<T, StartupError>;

/// Process-lifetime resources backing the query service.
pub struct Resources {
    pub records: Arc<RecordStore>,
    pub embedder: Arc<FastEmbedProvider>,
    pub index: Arc<HnswIndex>,
}

/// The concrete service the binaries run.
pub type PaperSearchService = QueryService<FastEmbedProvider, HnswIndex>;

impl Resources {
    /// Load every resource named by `config`.
    ///
    /// Blocking: model download and index deserialization happen here.
    ///
    /// # Errors
    /// Returns `StartupError` for the first resource that fails to load
    pub fn load(config: &AppConfig) -> StartupResult<Self> {
        config.validate()?;

        let records_path = config.records_path();
        let records = RecordStore::from_csv_path(&records_path)?;
        if records.is_empty() {
            return Err(StartupError::EmptyRecordStore(
                records_path.display().to_string(),
            ));
        }

        info!("Loading embedding model {:?}", config.model);
        let embedder = FastEmbedProvider::new(config.model, config.cache_dir.clone())?;
        info!(
            "Embedding model {} ready ({} dimensions)",
            embedder.model_name(),
            embedder.dimension()
        );

        info!("Loading vector index");
        let index = HnswIndex::load(
            &config.index_dir,
            &config.index_basename,
            embedder.dimension(),
            config.ef_search,
        )?;
        info!("Vector index ready ({} dimensions)", index.dimension());

        check_consistency(&records, &index);

        Ok(Self {
            records: Arc::new(records),
            embedder: Arc::new(embedder),
            index: Arc::new(index),
        })
    }

    /// Build the query service over these resources.
    pub fn query_service(&self) -> PaperSearchService {
        QueryService::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            Arc::clone(&self.records),
        )
    }
}

/// Warn when the index holds more vectors than there are records.
///
/// Such an index was almost certainly built from a different snapshot of the
/// corpus. Searches still run; any id that falls outside the store fails its
/// request with a lookup error.
///
/// # Returns
/// `true` if the sizes are consistent
pub fn check_consistency<I: VectorIndex>(records: &RecordStore, index: &I) -> bool {
    if index.len() > records.len() {
        warn!(
            "Vector index holds {} vectors but the record store has {} rows; \
             the two were likely built from different snapshots",
            index.len(),
            records.len()
        );
        return false;
    }
    info!(
        "Index holds {} vectors for {} records",
        index.len(),
        records.len()
    );
    true
}
