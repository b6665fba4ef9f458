//! Embedding provider abstraction and implementations.
//!
//! This module defines the interface the query service uses to turn query text
//! into a vector, and a local implementation backed by fastembed.
//!
//! The provider is treated as a black box: any tokenization or normalization
//! happens inside the model, the caller passes the raw query string.

pub mod fastembed;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The model could not be loaded (missing weights, unavailable backend)
    #[error("Model initialization failed: {0}")]
    InitError(String),

    /// The model ran but produced no usable vector
    #[error("Inference failed: {0}")]
    InferenceError(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for text embedding providers.
///
/// Implementations map a text to a fixed-length vector whose length is
/// reported by [`EmbeddingProvider::dimension`]. The same text must map to the
/// same vector for the lifetime of the provider.
///
/// # Example Usage
/// ```ignore
/// let provider = FastEmbedProvider::new(ModelChoice::Mpnet, None)?;
/// let embedding = provider.embed("graph neural networks").await?;
/// assert_eq!(embedding.len(), provider.dimension());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// # Errors
    /// Returns `EmbeddingError` if the embedding generation fails
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier for this provider.
    fn model_name(&self) -> &str;
}
