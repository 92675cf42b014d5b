//! Marketplace listings and the stores that hold them.
//!
//! The retrieval engine only reads listings: exact lookup by package id and
//! substring search. Writes come from the sell flow in [`crate::marketplace`].

mod memory;
mod sqlite;

pub use memory::MemoryListingStore;
pub use sqlite::SqliteListingStore;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::SubsecRound;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listing store lock poisoned")]
    LockPoisoned,
}

/// A knowledge package offered for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageListing {
    /// Package id; also the key of the package's summary embedding.
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub price: f64,
    pub seller: String,
    pub sold_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageListing {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            price: 0.0,
            seller: String::new(),
            sold_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub const fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.seller = seller.into();
        self
    }

    pub const fn with_sold_count(mut self, sold_count: u64) -> Self {
        self.sold_count = sold_count;
        self
    }

    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Tags as stored: comma-joined.
    pub fn joined_tags(&self) -> String {
        self.tags.join(",")
    }

    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.joined_tags().to_lowercase().contains(needle)
    }
}

/// Split a comma-joined tag string, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Stores keep millisecond timestamps.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Keyed record store for listings.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PackageListing>, StoreError>;

    /// Case-insensitive substring match over name, description and tags,
    /// ordered by sold count (desc) then creation time (desc).
    async fn search(&self, query: &str) -> Result<Vec<PackageListing>, StoreError>;

    /// Insert, or update an existing listing's content. `created_at` and
    /// `sold_count` of an existing listing are preserved.
    async fn upsert(&self, listing: &PackageListing) -> Result<(), StoreError>;

    /// Returns whether a listing existed.
    async fn remove(&self, id: &str) -> Result<bool, StoreError>;

    /// Increment the sold count. Returns whether the listing exists.
    async fn record_sale(&self, id: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("rust, async ,,cli"), vec!["rust", "async", "cli"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_matches_lowercase_covers_all_fields() {
        let listing = PackageListing::new("p1", "Tokio Internals", "Runtime deep dive")
            .with_tags(["rust", "async"]);
        assert!(listing.matches_lowercase("tokio"));
        assert!(listing.matches_lowercase("deep"));
        assert!(listing.matches_lowercase("st,as"));
        assert!(!listing.matches_lowercase("python"));
    }
}
