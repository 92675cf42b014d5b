//! In-memory listing store (tests, demos, ephemeral marketplaces).

use super::ListingStore;
use super::PackageListing;
use super::StoreError;
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryListingStore {
    listings: RwLock<HashMap<String, PackageListing>>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn get(&self, id: &str) -> Result<Option<PackageListing>, StoreError> {
        Ok(self.listings.read().await.get(id).cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<PackageListing>, StoreError> {
        let needle = query.to_lowercase();
        let mut hits: Vec<PackageListing> = self
            .listings
            .read()
            .await
            .values()
            .filter(|listing| listing.matches_lowercase(&needle))
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            (Reverse(a.sold_count), Reverse(a.created_at), &a.id).cmp(&(
                Reverse(b.sold_count),
                Reverse(b.created_at),
                &b.id,
            ))
        });
        Ok(hits)
    }

    async fn upsert(&self, listing: &PackageListing) -> Result<(), StoreError> {
        let mut listings = self.listings.write().await;
        let mut record = listing.clone();
        if let Some(existing) = listings.get(&listing.id) {
            record.created_at = existing.created_at;
            record.sold_count = existing.sold_count;
        }
        listings.insert(record.id.clone(), record);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.listings.write().await.remove(id).is_some())
    }

    async fn record_sale(&self, id: &str) -> Result<bool, StoreError> {
        let mut listings = self.listings.write().await;
        match listings.get_mut(id) {
            Some(listing) => {
                listing.sold_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
