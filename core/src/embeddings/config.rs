//! Configuration for embeddings.

use super::EmbeddingProvider;
use super::OpenAIProvider;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing::warn;

/// Environment variable holding the embeddings API key.
pub const EMBEDDING_KEY_ENV_VAR: &str = "KMARKET_EMBEDDING_KEY";

/// Fallback when [`EMBEDDING_KEY_ENV_VAR`] is unset.
pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// `[embeddings]` section of the marketplace config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbeddingsConfig {
    /// Whether semantic search is enabled (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Model to use (e.g., "text-embedding-3-small", "nomic-embed-text")
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional dimension override (for models that support it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,

    /// Full URL of an OpenAI-compatible embeddings endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_model(),
            dimensions: None,
            api_endpoint: None,
        }
    }
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Read the embeddings API key from the environment, ignoring blank values.
pub fn get_embedding_api_key() -> Option<String> {
    [EMBEDDING_KEY_ENV_VAR, OPENAI_API_KEY_ENV_VAR]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| !key.trim().is_empty())
}

/// Build the configured provider, or `None` when semantic search is off.
pub fn build_provider(config: &EmbeddingsConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    build_provider_with_key(config, get_embedding_api_key())
}

pub(crate) fn build_provider_with_key(
    config: &EmbeddingsConfig,
    api_key: Option<String>,
) -> Option<Arc<dyn EmbeddingProvider>> {
    if !config.enabled {
        info!("Embeddings disabled - keyword search only");
        return None;
    }

    let provider = OpenAIProvider::new(
        api_key.unwrap_or_default(),
        config.model.clone(),
        config.dimensions,
        config.api_endpoint.clone(),
    );

    if !provider.is_available() {
        warn!(
            "Embeddings enabled but no API key found in {} or {}; falling back to keyword search",
            EMBEDDING_KEY_ENV_VAR, OPENAI_API_KEY_ENV_VAR
        );
        return None;
    }

    info!(
        "Using embedding model {} ({} dims)",
        provider.model_id(),
        provider.dimensions()
    );
    Some(Arc::new(provider))
}
