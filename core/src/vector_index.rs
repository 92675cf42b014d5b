//! Brute-force cosine index over package summary embeddings.
//!
//! Every entry is keyed by a string id and carries a fixed-length embedding.
//! The index never mixes dimensionalities: a vector of the wrong length is
//! rejected on both the write and the query path.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Dimensionality used when none is configured.
pub const DEFAULT_DIMENSIONS: usize = 768;

/// Free-form metadata attached to an entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid dimensions: {0} (must be positive)")]
    InvalidDimensions(usize),

    #[error("Index file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Corrupt index file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorEntry {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One neighbour returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    pub id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    pub metadata: Metadata,
}

/// On-disk layout. Field names are shared with existing index files.
#[derive(Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<VectorEntry>,
    dimensions: usize,
}

/// In-memory vector index with single-file persistence.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    entries: BTreeMap<String, VectorEntry>,
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            entries: BTreeMap::new(),
        }
    }
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Result<Self, IndexError> {
        if dimensions == 0 {
            return Err(IndexError::InvalidDimensions(dimensions));
        }
        Ok(Self {
            dimensions,
            entries: BTreeMap::new(),
        })
    }

    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_dimensions(&self, actual: usize) -> Result<(), IndexError> {
        if actual != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual,
            });
        }
        Ok(())
    }

    /// Insert or overwrite the entry for `id`.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<(), IndexError> {
        self.check_dimensions(embedding.len())?;
        let id = id.into();
        self.entries.insert(
            id.clone(),
            VectorEntry {
                id,
                embedding,
                metadata,
            },
        );
        Ok(())
    }

    /// Insert a batch atomically: nothing is applied unless every item fits.
    pub fn add_batch<I>(&mut self, items: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = VectorEntry>,
    {
        let items: Vec<VectorEntry> = items.into_iter().collect();
        for item in &items {
            self.check_dimensions(item.embedding.len())?;
        }
        for item in items {
            self.entries.insert(item.id.clone(), item);
        }
        Ok(())
    }

    /// Top-`top_k` entries by cosine similarity to `embedding`, best first.
    pub fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, IndexError> {
        self.check_dimensions(embedding.len())?;

        let mut matches: Vec<VectorMatch> = self
            .entries
            .values()
            .map(|entry| VectorMatch {
                id: entry.id.clone(),
                score: cosine_similarity(embedding, &entry.embedding),
                metadata: entry.metadata.clone(),
            })
            .collect();

        // Stable sort: equal scores keep id order.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);

        Ok(matches)
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&VectorEntry> {
        self.entries.get(id)
    }

    /// Returns whether an entry existed.
    pub fn delete(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &VectorEntry> {
        self.entries.values()
    }

    /// Write the whole index to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let file = IndexFile {
            entries: self.entries.values().cloned().collect(),
            dimensions: self.dimensions,
        };
        let bytes = serde_json::to_vec(&file)?;

        // Readers never observe a half-written file; concurrent writers still race.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

        debug!(
            "Saved vector index ({} entries, {} dims) to {}",
            self.entries.len(),
            self.dimensions,
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::NotFound(path.to_path_buf()));
        }

        let data = std::fs::read(path)?;
        let file: IndexFile = serde_json::from_slice(&data)?;

        if file.dimensions == 0 {
            return Err(IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: "dimensions must be positive".to_string(),
            });
        }

        let mut entries = BTreeMap::new();
        for entry in file.entries {
            if entry.embedding.len() != file.dimensions {
                return Err(IndexError::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!(
                        "entry {} has {} dimensions, index has {}",
                        entry.id,
                        entry.embedding.len(),
                        file.dimensions
                    ),
                });
            }
            entries.insert(entry.id.clone(), entry);
        }

        debug!(
            "Loaded vector index ({} entries, {} dims) from {}",
            entries.len(),
            file.dimensions,
            path.display()
        );

        Ok(Self {
            dimensions: file.dimensions,
            entries,
        })
    }
}

/// Cosine similarity; zero when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        // Rounding can push identical vectors a hair past 1.0.
        (dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0)
    }
}
