//! Hybrid marketplace search.
//!
//! # Pipeline
//!
//! ```text
//! query ──► keyword search (listing store, always) ──────────────┐
//!   │                                                            ├─► weighted fusion ─► top `limit`
//!   └────► embed ─► vector index top-k ─► resolve listings ──────┘
//!          (only with a provider and a non-empty index)
//! ```
//!
//! Keyword hits are scored by rank (`1.0 - 0.05 * rank`) so both legs share
//! a comparable scale; fusion weights semantic similarity at 0.6 and the
//! keyword score at 0.4.

use crate::embeddings::EmbeddingProvider;
use crate::error::MarketError;
use crate::error::Result;
use crate::listing::ListingStore;
use crate::listing::PackageListing;
use crate::vector_index::IndexError;
use crate::vector_index::Metadata;
use crate::vector_index::VectorIndex;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing::info;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Weight of the rank-derived keyword score in a fused result.
pub const KEYWORD_WEIGHT: f32 = 0.4;

/// Weight of cosine similarity in a fused result.
pub const SEMANTIC_WEIGHT: f32 = 0.6;

/// Score drop per keyword rank position.
pub const KEYWORD_RANK_STEP: f32 = 0.05;

/// Metadata key recorded on every summary embedding.
pub const PACKAGE_ID_KEY: &str = "packageId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Keyword,
    Semantic,
    Combined,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Keyword => write!(f, "keyword"),
            MatchType::Semantic => write!(f, "semantic"),
            MatchType::Combined => write!(f, "combined"),
        }
    }
}

/// A ranked listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub listing: PackageListing,
    pub score: f32,
    pub match_type: MatchType,
}

/// Keyword score for a zero-based rank.
pub fn keyword_score(rank: usize) -> f32 {
    1.0 - KEYWORD_RANK_STEP * rank as f32
}

/// Provider plus the summary index it feeds.
struct SemanticLayer {
    provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    index_path: PathBuf,
}

pub struct RetrievalEngine {
    store: Arc<dyn ListingStore>,
    semantic: Option<SemanticLayer>,
}

impl RetrievalEngine {
    /// Keyword-only engine.
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self {
            store,
            semantic: None,
        }
    }

    /// Engine with semantic search. Loads the index at `index_path` if it
    /// exists, otherwise starts empty with the provider's dimensionality.
    pub fn with_semantic(
        store: Arc<dyn ListingStore>,
        provider: Arc<dyn EmbeddingProvider>,
        index_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let index_path = index_path.into();
        let index = load_or_empty(&index_path, provider.dimensions())?;
        info!(
            "Semantic search enabled: {} ({} indexed summaries)",
            provider.model_id(),
            index.len()
        );
        Ok(Self {
            store,
            semantic: Some(SemanticLayer {
                provider,
                index,
                index_path,
            }),
        })
    }

    /// Build from an optional provider, so callers need not branch.
    pub fn from_parts(
        store: Arc<dyn ListingStore>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
        index_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        match provider {
            Some(provider) => Self::with_semantic(store, provider, index_path),
            None => Ok(Self::new(store)),
        }
    }

    pub fn store(&self) -> &Arc<dyn ListingStore> {
        &self.store
    }

    /// Whether a query would take the semantic leg.
    pub fn semantic_ready(&self) -> bool {
        self.semantic
            .as_ref()
            .is_some_and(|layer| !layer.index.is_empty())
    }

    pub fn summary_index(&self) -> Option<&VectorIndex> {
        self.semantic.as_ref().map(|layer| &layer.index)
    }

    pub async fn keyword_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let listings = self.store.search(query).await?;
        Ok(listings
            .into_iter()
            .enumerate()
            .map(|(rank, listing)| SearchResult {
                listing,
                score: keyword_score(rank),
                match_type: MatchType::Keyword,
            })
            .collect())
    }

    /// Empty when no provider is configured or nothing has been indexed.
    pub async fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let Some(layer) = self.semantic.as_ref() else {
            return Ok(Vec::new());
        };
        if layer.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = layer.provider.embed(query).await?;
        let neighbours = layer.index.query(&query_vector, limit)?;

        let mut results = Vec::with_capacity(neighbours.len());
        let mut dropped = 0usize;
        for neighbour in neighbours {
            match self.store.get(&neighbour.id).await? {
                Some(listing) => results.push(SearchResult {
                    listing,
                    score: neighbour.score,
                    match_type: MatchType::Semantic,
                }),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(
                "Dropped {} semantic neighbours with no matching listing",
                dropped
            );
        }
        Ok(results)
    }

    /// Hybrid search: keyword always, semantic when available, fused by weight.
    ///
    /// Embedding failures during the semantic leg are returned to the caller
    /// rather than downgraded to keyword-only results.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let mut keyword = self.keyword_search(query).await?;

        let semantic = if self.semantic_ready() {
            self.semantic_search(query, limit).await?
        } else {
            Vec::new()
        };

        debug!(
            "Search {:?}: {} keyword hits, {} semantic hits",
            query,
            keyword.len(),
            semantic.len()
        );

        if semantic.is_empty() {
            keyword.truncate(limit);
            return Ok(keyword);
        }

        Ok(fuse_results(keyword, semantic, limit))
    }

    /// Embed `summary` and store it under `package_id`, then persist the index.
    pub async fn index_package_summary(&mut self, package_id: &str, summary: &str) -> Result<()> {
        let layer = self
            .semantic
            .as_mut()
            .ok_or(MarketError::SemanticUnavailable)?;

        let embedding = layer.provider.embed(summary).await?;

        let mut metadata = Metadata::new();
        metadata.insert(PACKAGE_ID_KEY.to_string(), package_id.into());
        layer.index.add(package_id, embedding, metadata)?;
        layer.index.save(&layer.index_path)?;

        debug!(
            "Indexed summary for {} ({} summaries total)",
            package_id,
            layer.index.len()
        );
        Ok(())
    }

    /// Drop `package_id` from the summary index and persist. Returns whether
    /// it was indexed.
    pub fn remove_package_summary(&mut self, package_id: &str) -> Result<bool> {
        let Some(layer) = self.semantic.as_mut() else {
            return Ok(false);
        };
        if !layer.index.delete(package_id) {
            return Ok(false);
        }
        layer.index.save(&layer.index_path)?;
        Ok(true)
    }

    /// Reload the persisted index, replacing the in-memory one. Returns
    /// `false` when semantic search is off or no file exists yet.
    pub fn load_summary_index(&mut self) -> Result<bool> {
        let Some(layer) = self.semantic.as_mut() else {
            return Ok(false);
        };
        if !layer.index_path.exists() {
            return Ok(false);
        }
        layer.index = load_checked(&layer.index_path, layer.provider.dimensions())?;
        Ok(true)
    }
}

fn load_or_empty(path: &Path, dimensions: usize) -> Result<VectorIndex> {
    if path.exists() {
        load_checked(path, dimensions)
    } else {
        Ok(VectorIndex::new(dimensions)?)
    }
}

/// A persisted index built with another model cannot be queried with this one.
fn load_checked(path: &Path, dimensions: usize) -> Result<VectorIndex> {
    let index = VectorIndex::load(path)?;
    if index.dimensions() != dimensions {
        return Err(IndexError::DimensionMismatch {
            expected: dimensions,
            actual: index.dimensions(),
        }
        .into());
    }
    Ok(index)
}

#[derive(Debug)]
struct FusedEntry {
    listing: PackageListing,
    keyword_score: f32,
    semantic_score: f32,
    from_keyword: bool,
}

/// Merge keyword and semantic hits by listing id.
///
/// Missing sides score 0. The combined score is
/// `KEYWORD_WEIGHT * keyword + SEMANTIC_WEIGHT * semantic`; the match type
/// records which sides contributed a nonzero score (an entry scoring zero on
/// both sides keeps the type of the leg that found it). Ordering is stable:
/// keyword order first, then semantic-only hits, before the score sort.
pub fn fuse_results(
    keyword: Vec<SearchResult>,
    semantic: Vec<SearchResult>,
    limit: usize,
) -> Vec<SearchResult> {
    let mut entries: Vec<FusedEntry> = Vec::with_capacity(keyword.len() + semantic.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for result in keyword {
        positions.insert(result.listing.id.clone(), entries.len());
        entries.push(FusedEntry {
            listing: result.listing,
            keyword_score: result.score,
            semantic_score: 0.0,
            from_keyword: true,
        });
    }

    for result in semantic {
        match positions.get(&result.listing.id) {
            Some(&pos) => entries[pos].semantic_score = result.score,
            None => {
                positions.insert(result.listing.id.clone(), entries.len());
                entries.push(FusedEntry {
                    listing: result.listing,
                    keyword_score: 0.0,
                    semantic_score: result.score,
                    from_keyword: false,
                });
            }
        }
    }

    let mut fused: Vec<SearchResult> = entries
        .into_iter()
        .map(|entry| {
            let match_type = match (entry.keyword_score != 0.0, entry.semantic_score != 0.0) {
                (true, true) => MatchType::Combined,
                (true, false) => MatchType::Keyword,
                (false, true) => MatchType::Semantic,
                // Both zero: label by the leg that found it.
                (false, false) if entry.from_keyword => MatchType::Keyword,
                (false, false) => MatchType::Semantic,
            };
            SearchResult {
                score: entry.keyword_score * KEYWORD_WEIGHT
                    + entry.semantic_score * SEMANTIC_WEIGHT,
                listing: entry.listing,
                match_type,
            }
        })
        .collect();

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(limit);
    fused
}
