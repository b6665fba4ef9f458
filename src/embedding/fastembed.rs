//! FastEmbed embedding provider implementation.
//!
//! This module provides an implementation of the `EmbeddingProvider` trait
//! using the fastembed library for local sentence-transformer inference.
//! Model weights are downloaded on first use into the cache directory.

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use async_trait::async_trait;
use clap::ValueEnum;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Sentence-embedding models the server can be started with.
///
/// The model must match the one the vector index was built with, otherwise
/// distances are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelChoice {
    /// paraphrase-multilingual-mpnet-base-v2 (768 dimensions)
    Mpnet,
    /// all-MiniLM-L6-v2 (384 dimensions)
    MiniLm,
    /// BAAI/bge-small-en-v1.5 (384 dimensions)
    BgeSmall,
    /// BAAI/bge-base-en-v1.5 (768 dimensions)
    BgeBase,
}

impl ModelChoice {
    /// The fastembed model backing this choice.
    pub fn model(self) -> EmbeddingModel {
        match self {
            ModelChoice::Mpnet => EmbeddingModel::ParaphraseMLMpnetBaseV2,
            ModelChoice::MiniLm => EmbeddingModel::AllMiniLML6V2,
            ModelChoice::BgeSmall => EmbeddingModel::BGESmallENV15,
            ModelChoice::BgeBase => EmbeddingModel::BGEBaseENV15,
        }
    }

    /// Output dimension of the model.
    pub fn dimension(self) -> usize {
        match self {
            ModelChoice::Mpnet | ModelChoice::BgeBase => 768,
            ModelChoice::MiniLm | ModelChoice::BgeSmall => 384,
        }
    }
}

/// FastEmbed embedding provider.
///
/// This struct holds the loaded model and its metadata. Cloning is cheap and
/// shares the same model instance.
#[derive(Clone)]
pub struct FastEmbedProvider {
    /// The embedding model instance (wrapped in Arc<Mutex> for thread-safety)
    model: Arc<Mutex<TextEmbedding>>,

    /// Model identifier
    model_name: String,

    /// Expected dimension of the embedding vectors
    embedding_dimension: usize,
}

impl FastEmbedProvider {
    /// Load a FastEmbed model.
    ///
    /// # Arguments
    /// * `choice` - Which model to load
    /// * `cache_dir` - Optional cache directory for model files
    ///
    /// # Errors
    /// Returns `EmbeddingError::InitError` if the model cannot be downloaded
    /// or the inference backend is unavailable
    pub fn new(choice: ModelChoice, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model_type = choice.model();
        let model_name = format!("{:?}", model_type);

        let mut init_options = InitOptions::new(model_type);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }

        let text_embedding = TextEmbedding::try_new(init_options).map_err(|e| {
            EmbeddingError::InitError(format!("Failed to initialize FastEmbed model: {}", e))
        })?;

        debug!("Loaded FastEmbed model {}", model_name);

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name,
            embedding_dimension: choice.dimension(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    /// Inference is CPU-bound and runs through `block_in_place`, so this must
    /// be called from a multi-threaded tokio runtime.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let model = self.model.lock().await;

        let embeddings = tokio::task::block_in_place(|| model.embed(vec![text], None))
            .map_err(|e| EmbeddingError::InferenceError(format!("Embedding generation failed: {}", e)))?;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InferenceError("No embedding generated".to_string()))?;

        if embedding.len() != self.embedding_dimension {
            return Err(EmbeddingError::InferenceError(format!(
                "Model produced {} dimensions, expected {}",
                embedding.len(),
                self.embedding_dimension
            )));
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

// TextEmbedding does not implement Debug
impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("embedding_dimension", &self.embedding_dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider() -> FastEmbedProvider {
        FastEmbedProvider::new(ModelChoice::MiniLm, None)
            .expect("Failed to create FastEmbedProvider")
    }

    #[test]
    fn test_model_choice_dimensions() {
        assert_eq!(ModelChoice::Mpnet.dimension(), 768);
        assert_eq!(ModelChoice::BgeBase.dimension(), 768);
        assert_eq!(ModelChoice::MiniLm.dimension(), 384);
        assert_eq!(ModelChoice::BgeSmall.dimension(), 384);
    }

    #[test]
    fn test_model_choice_parses_from_cli_names() {
        assert_eq!(ModelChoice::from_str("mpnet", false).unwrap(), ModelChoice::Mpnet);
        assert_eq!(ModelChoice::from_str("mini-lm", false).unwrap(), ModelChoice::MiniLm);
        assert_eq!(ModelChoice::from_str("bge-small", false).unwrap(), ModelChoice::BgeSmall);
        assert!(ModelChoice::from_str("word2vec", false).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "downloads model weights"]
    async fn test_embed_single_text() {
        let provider = create_test_provider();

        let embedding = provider
            .embed("Graph neural networks for molecule property prediction")
            .await
            .unwrap();

        assert_eq!(embedding.len(), provider.dimension());
        assert!(embedding.iter().all(|x| x.is_finite()));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "downloads model weights"]
    async fn test_embed_consistency() {
        let provider = create_test_provider();
        let text = "Consistency test text";

        let first = provider.embed(text).await.unwrap();
        let second = provider.embed(text).await.unwrap();

        assert_eq!(first, second, "Same text should produce identical embeddings");
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "downloads model weights"]
    async fn test_concurrent_embeddings() {
        let provider = Arc::new(create_test_provider());

        let mut handles = vec![];
        for i in 0..4 {
            let provider = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                provider.embed(&format!("Concurrent test text {}", i)).await
            }));
        }

        for handle in handles {
            let result = handle.await.expect("Task should complete");
            assert!(result.is_ok(), "Concurrent embedding should succeed");
        }
    }

    #[test]
    #[ignore = "downloads model weights"]
    fn test_debug_implementation() {
        let provider = create_test_provider();
        let debug_str = format!("{:?}", provider);

        assert!(debug_str.contains("FastEmbedProvider"));
        assert!(debug_str.contains("AllMiniLML6V2"));
    }
}
