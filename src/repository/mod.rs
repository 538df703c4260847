//! Storage layer: one capability trait, three interchangeable backends

pub mod json;
pub mod memory;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{config::StorageConfig, models::book::{seed_catalog, Book}};

pub use json::JsonStore;
pub use memory::MemoryStore;
pub use sql::SqlStore;

/// Failures reported by a store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("book {0} not found")]
    NotFound(String),

    #[error("book already exists: {0}")]
    Duplicate(String),

    #[error("book {0} has no copies left")]
    Exhausted(String),

    #[error("quantity of book {0} is out of range")]
    QuantityOverflow(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/search/write contract every backend implements with the same
/// observable behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books, ordered by author
    async fn list(&self) -> StoreResult<Vec<Book>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Book>;

    /// Insert a book carrying a pre-assigned id. Fails with `Duplicate` on an
    /// id collision or a case-insensitive title+author collision.
    async fn create(&self, book: Book) -> StoreResult<String>;

    /// Replace title, author and quantity of an existing book
    async fn update(&self, book: Book) -> StoreResult<()>;

    /// Case-insensitive substring match on the title
    async fn find_by_title(&self, title: &str) -> StoreResult<Vec<Book>>;

    /// Case-insensitive substring match on the author
    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Book>>;

    /// Add `delta` to the available quantity, refusing to go below zero.
    ///
    /// The provided body reads, checks and writes back through `update`, so
    /// two callers may interleave between the read and the write. Backends
    /// override it with a version that holds their lock (or runs a single
    /// conditional statement) across the whole step.
    async fn adjust_quantity(&self, id: &str, delta: i64) -> StoreResult<Book> {
        let mut book = self.find_by_id(id).await?;
        book.quantity = adjusted_quantity(&book, delta)?;
        self.update(book.clone()).await?;
        Ok(book)
    }
}

/// `quantity + delta`, refused below zero and past `i64::MAX`
pub(crate) fn adjusted_quantity(book: &Book, delta: i64) -> StoreResult<i64> {
    match book.quantity.checked_add(delta) {
        Some(quantity) if quantity >= 0 => Ok(quantity),
        Some(_) => Err(StoreError::Exhausted(book.id.clone())),
        None if delta < 0 => Err(StoreError::Exhausted(book.id.clone())),
        None => Err(StoreError::QuantityOverflow(book.id.clone())),
    }
}

/// Backend selector, resolved once from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Json,
    #[serde(alias = "sql", alias = "relational")]
    Sqlite,
}

/// Build the configured store
pub async fn create_store(config: &StorageConfig) -> StoreResult<Arc<dyn BookStore>> {
    let seed = if config.seed { seed_catalog() } else { Vec::new() };

    tracing::info!("Starting with {:?} store", config.kind);

    let store: Arc<dyn BookStore> = match config.kind {
        StoreKind::Memory => Arc::new(MemoryStore::new(seed)),
        StoreKind::Json => Arc::new(JsonStore::open(&config.json_path, seed).await?),
        StoreKind::Sqlite => {
            let store = SqlStore::connect(&config.database_url, config.max_connections).await?;
            store.init_schema().await?;
            Arc::new(store)
        }
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_deserializes_aliases() {
        let kind: StoreKind = serde_json::from_str("\"relational\"").unwrap();
        assert_eq!(kind, StoreKind::Sqlite);
        let kind: StoreKind = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(kind, StoreKind::Json);
        assert!(serde_json::from_str::<StoreKind>("\"mongo\"").is_err());
    }

    #[test]
    fn adjusted_quantity_stays_in_range() {
        let book = Book::new("1", "Dune", "Herbert", 2);
        assert_eq!(adjusted_quantity(&book, -2).unwrap(), 0);
        assert!(matches!(adjusted_quantity(&book, -3), Err(StoreError::Exhausted(_))));
        assert!(matches!(adjusted_quantity(&book, i64::MIN), Err(StoreError::Exhausted(_))));

        let full = Book::new("2", "Emma", "Austen", i64::MAX);
        assert!(matches!(adjusted_quantity(&full, 1), Err(StoreError::QuantityOverflow(id)) if id == "2"));
        assert_eq!(adjusted_quantity(&full, -1).unwrap(), i64::MAX - 1);
    }

    #[tokio::test]
    async fn factory_builds_a_seeded_memory_store() {
        let config = StorageConfig {
            kind: StoreKind::Memory,
            seed: true,
            ..StorageConfig::default()
        };

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn factory_builds_an_empty_sqlite_store() {
        let config = StorageConfig {
            kind: StoreKind::Sqlite,
            database_url: "sqlite::memory:".to_string(),
            ..StorageConfig::default()
        };

        let store = create_store(&config).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
