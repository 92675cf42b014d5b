//! Embedding providers used to turn package summaries and queries into vectors.
//!
//! Embeddings are optional. When no provider is configured the marketplace
//! still answers every query through keyword matching alone.

pub mod config;
pub mod providers;

pub use config::EmbeddingsConfig;
pub use config::build_provider;
pub use providers::OpenAIProvider;

use async_trait::async_trait;
use thiserror::Error;

pub type EmbeddingVector = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the unique model identifier
    fn model_id(&self) -> String;

    /// Get the actual dimensions for this model
    fn dimensions(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;

    /// Embed multiple texts in batch
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError>;

    /// Check if this provider is usable (credentials present)
    fn is_available(&self) -> bool;
}
