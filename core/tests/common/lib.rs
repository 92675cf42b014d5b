//! Shared fixtures for kmarket-core integration tests.

use async_trait::async_trait;
use kmarket_core::EmbeddingError;
use kmarket_core::EmbeddingProvider;
use kmarket_core::ListingStore;
use kmarket_core::MemoryListingStore;
use kmarket_core::PackageListing;
use kmarket_core::embeddings::EmbeddingVector;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Terms the fake provider maps onto axes.
pub const VOCABULARY: [&str; 7] = [
    "typescript",
    "types",
    "solidity",
    "contract",
    "python",
    "ml",
    "training",
];

/// Deterministic bag-of-words embedder over [`VOCABULARY`].
#[derive(Default)]
pub struct VocabularyProvider {
    calls: AtomicUsize,
}

impl VocabularyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn vocabulary_vector(text: &str) -> EmbeddingVector {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    VOCABULARY
        .iter()
        .map(|term| tokens.iter().filter(|t| t.as_str() == *term).count() as f32)
        .collect()
}

#[async_trait]
impl EmbeddingProvider for VocabularyProvider {
    fn model_id(&self) -> String {
        "test:vocabulary".to_string()
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vocabulary_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| vocabulary_vector(text)).collect())
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Provider whose every call fails, as if the API were unreachable.
pub struct FailingProvider {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn model_id(&self) -> String {
        "test:failing".to_string()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        Err(EmbeddingError::ApiError("connection refused".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        Err(EmbeddingError::ApiError("connection refused".to_string()))
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// The three reference listings with their summaries.
pub fn sample_listings() -> Vec<(PackageListing, &'static str)> {
    vec![
        (
            PackageListing::new("ts", "TS Handbook", "Patterns for large codebases")
                .with_tags(["typescript", "guide"])
                .with_price(0.01),
            "typescript types patterns",
        ),
        (
            PackageListing::new("sol", "Contract Audits", "Checklist for auditors")
                .with_tags(["solidity", "blockchain"])
                .with_price(0.05),
            "solidity contract security",
        ),
        (
            PackageListing::new("py", "Model Zoo", "Notes on training pipelines")
                .with_tags(["python", "ml"])
                .with_price(0.02),
            "python ml training",
        ),
    ]
}

pub async fn seeded_memory_store() -> Arc<MemoryListingStore> {
    let store = Arc::new(MemoryListingStore::new());
    for (listing, _) in sample_listings() {
        store
            .upsert(&listing)
            .await
            .unwrap_or_else(|e| panic!("seed listing {}: {e}", listing.id));
    }
    store
}
