//! Error types shared across the marketplace crates.

use crate::embeddings::EmbeddingError;
use crate::listing::StoreError;
use crate::vector_index::IndexError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

#[derive(Error, Debug)]
pub enum MarketError {
    /// Vector index failures, including dimension mismatches
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Embedding provider failures (network, API, malformed response)
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Listing store failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration could not be read
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A semantic operation was requested without an embedding provider
    #[error("semantic search is not configured (no embedding provider)")]
    SemanticUnavailable,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot determine home directory; set KMARKET_HOME")]
    NoHomeDir,
}
