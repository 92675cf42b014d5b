//! Sell and search flows over a listing store and the retrieval engine.

use crate::config::MarketConfig;
use crate::embeddings::EmbeddingProvider;
use crate::embeddings::build_provider;
use crate::error::MarketError;
use crate::error::Result;
use crate::listing::ListingStore;
use crate::listing::PackageListing;
use crate::listing::SqliteListingStore;
use crate::listing::now_millis;
use crate::retrieval::RetrievalEngine;
use crate::retrieval::SearchResult;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// What happened when a package was listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListingOutcome {
    /// False when the summary could not be embedded; the listing is then
    /// discoverable by keyword only.
    pub semantically_indexed: bool,
}

pub struct Marketplace {
    store: Arc<dyn ListingStore>,
    engine: RetrievalEngine,
}

impl Marketplace {
    pub fn new(engine: RetrievalEngine) -> Self {
        Self {
            store: Arc::clone(engine.store()),
            engine,
        }
    }

    /// SQLite store plus the configured embedding provider, if any.
    pub fn open(config: &MarketConfig) -> Result<Self> {
        let provider = build_provider(&config.embeddings);
        Self::open_with_provider(config, provider)
    }

    /// An index file that cannot be used (corrupt, or built for another
    /// dimensionality) degrades the marketplace to keyword search; the file is
    /// left in place.
    pub fn open_with_provider(
        config: &MarketConfig,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        let store: Arc<dyn ListingStore> =
            Arc::new(SqliteListingStore::open(&config.database_path())?);
        let index_path = config.index_path();
        let engine = match RetrievalEngine::from_parts(Arc::clone(&store), provider, &index_path) {
            Ok(engine) => engine,
            Err(MarketError::Index(err)) => {
                warn!(
                    "Ignoring summary index {}: {}; keyword search only",
                    index_path.display(),
                    err
                );
                RetrievalEngine::new(store)
            }
            Err(err) => return Err(err),
        };
        Ok(Self::new(engine))
    }

    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }

    /// Register `listing` and make it semantically discoverable.
    ///
    /// Only a store failure fails the call; indexing problems are logged and
    /// reported through [`ListingOutcome`].
    pub async fn list_package(
        &mut self,
        mut listing: PackageListing,
        summary: &str,
    ) -> Result<ListingOutcome> {
        listing.updated_at = now_millis();
        self.store.upsert(&listing).await?;
        info!("Listed package {} ({})", listing.id, listing.name);

        if self.engine.summary_index().is_none() {
            debug!("Semantic search off; {} is keyword-only", listing.id);
            return Ok(ListingOutcome {
                semantically_indexed: false,
            });
        }

        let semantically_indexed = match self
            .engine
            .index_package_summary(&listing.id, summary)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "Package {} listed without semantic index entry: {}",
                    listing.id, err
                );
                false
            }
        };

        Ok(ListingOutcome {
            semantically_indexed,
        })
    }

    /// Remove a listing. Returns whether it existed.
    pub async fn delist_package(&mut self, id: &str) -> Result<bool> {
        let existed = self.store.remove(id).await?;
        if let Err(err) = self.engine.remove_package_summary(id) {
            warn!("Failed to drop summary embedding for {}: {}", id, err);
        }
        Ok(existed)
    }

    /// Record a completed purchase. Returns whether the listing exists.
    pub async fn record_sale(&self, id: &str) -> Result<bool> {
        Ok(self.store.record_sale(id).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<PackageListing>> {
        Ok(self.store.get(id).await?)
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.engine.search(query, limit).await
    }

    /// Keyword leg only, truncated to `limit`.
    pub async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let mut results = self.engine.keyword_search(query).await?;
        results.truncate(limit);
        Ok(results)
    }
}
