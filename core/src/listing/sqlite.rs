//! SQLite-backed listing store.

use super::ListingStore;
use super::PackageListing;
use super::StoreError;
use super::parse_tags;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;
use tracing::debug;

const SELECT_COLUMNS: &str =
    "id, name, description, tags, price, seller, sold_count, created_at, updated_at";

pub struct SqliteListingStore {
    conn: Mutex<Connection>,
}

impl SqliteListingStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS listings (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL DEFAULT 0,
            seller TEXT NOT NULL DEFAULT '',
            sold_count INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_listings_rank ON listings(sold_count DESC, created_at DESC)",
        [],
    )?;

    Ok(())
}

/// Escape LIKE wildcards so the query matches as a literal substring.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn timestamp(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<PackageListing> {
    let tags: String = row.get(3)?;
    let sold_count: i64 = row.get(6)?;
    Ok(PackageListing {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        tags: parse_tags(&tags),
        price: row.get(4)?,
        seller: row.get(5)?,
        sold_count: u64::try_from(sold_count).unwrap_or(0),
        created_at: timestamp(7, row.get(7)?)?,
        updated_at: timestamp(8, row.get(8)?)?,
    })
}

#[async_trait]
impl ListingStore for SqliteListingStore {
    async fn get(&self, id: &str) -> Result<Option<PackageListing>, StoreError> {
        let conn = self.lock()?;
        let listing = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM listings WHERE id = ?1"),
                params![id],
                row_to_listing,
            )
            .optional()?;
        Ok(listing)
    }

    async fn search(&self, query: &str) -> Result<Vec<PackageListing>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            r"SELECT {SELECT_COLUMNS} FROM listings
              WHERE name LIKE ?1 ESCAPE '\'
                 OR description LIKE ?1 ESCAPE '\'
                 OR tags LIKE ?1 ESCAPE '\'
              ORDER BY sold_count DESC, created_at DESC, id ASC"
        ))?;
        let listings = stmt
            .query_map(params![like_pattern(query)], row_to_listing)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Keyword pattern {:?} matched {} listings", query, listings.len());
        Ok(listings)
    }

    async fn upsert(&self, listing: &PackageListing) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO listings (id, name, description, tags, price, seller, sold_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                tags = excluded.tags,
                price = excluded.price,
                seller = excluded.seller,
                updated_at = excluded.updated_at",
            params![
                listing.id,
                listing.name,
                listing.description,
                listing.joined_tags(),
                listing.price,
                listing.seller,
                i64::try_from(listing.sold_count).unwrap_or(i64::MAX),
                listing.created_at.timestamp_millis(),
                listing.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM listings WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    async fn record_sale(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE listings SET sold_count = sold_count + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(updated > 0)
    }
}
