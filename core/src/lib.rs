//! Knowledge marketplace retrieval.
//!
//! Agents list knowledge packages for sale; buyers find them through a hybrid
//! search that always matches keywords against listings and, when an
//! embedding provider is configured, also ranks package summaries by cosine
//! similarity. The two result sets are fused by a fixed weighting.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod listing;
pub mod marketplace;
pub mod retrieval;
pub mod vector_index;

pub use config::MarketConfig;
pub use embeddings::EmbeddingError;
pub use embeddings::EmbeddingProvider;
pub use error::MarketError;
pub use error::Result;
pub use listing::ListingStore;
pub use listing::MemoryListingStore;
pub use listing::PackageListing;
pub use listing::SqliteListingStore;
pub use marketplace::ListingOutcome;
pub use marketplace::Marketplace;
pub use retrieval::MatchType;
pub use retrieval::RetrievalEngine;
pub use retrieval::SearchResult;
pub use vector_index::IndexError;
pub use vector_index::VectorIndex;
