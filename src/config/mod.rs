//! Command-line and environment configuration shared by the binaries.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;

use crate::embedding::fastembed::ModelChoice;
use crate::index::hnsw::DEFAULT_EF_SEARCH;

/// Default record store file name inside the data directory.
pub const DEFAULT_RECORDS_FILE: &str = "arxiv_processed.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where to find the record store, the vector index and the embedding model.
#[derive(Args, Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the record store file
    #[arg(long, env = "PAPER_DATA_DIR", value_name = "DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Record store CSV file name, relative to the data directory
    #[arg(long, value_name = "FILE", default_value = DEFAULT_RECORDS_FILE)]
    pub records_file: String,

    /// Directory holding the HNSW index dump
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub index_dir: PathBuf,

    /// Basename of the HNSW index dump
    #[arg(long, value_name = "NAME", default_value = "index")]
    pub index_basename: String,

    /// HNSW search breadth
    #[arg(long, value_name = "N", default_value_t = DEFAULT_EF_SEARCH)]
    pub ef_search: usize,

    /// Embedding model; must match the model the index was built with
    #[arg(long, value_enum, default_value = "mpnet")]
    pub model: ModelChoice,

    /// FastEmbed model cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Logging verbosity level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}

impl AppConfig {
    /// Full path of the record store file.
    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join(&self.records_file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ef_search == 0 {
            return Err(ConfigError::Invalid("ef_search must be at least 1".to_string()));
        }
        if self.records_file.trim().is_empty() {
            return Err(ConfigError::Invalid("records file name is empty".to_string()));
        }
        Ok(())
    }
}
