//! Relational store on SQLite through sqlx
//!
//! No in-process locking: each call is one statement and the database
//! provides the isolation.
//!
//! SQLite folds case for ASCII only, so case-insensitive matching runs on
//! `title_key`/`author_key` columns holding the Rust-lowercased text.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use super::{adjusted_quantity, BookStore, StoreError, StoreResult};
use crate::models::book::Book;

const COLUMNS: &str = "id, title, author, quantity";

/// SQL-backed store holding only a connection pool
#[derive(Clone)]
pub struct SqlStore {
    pool: Pool<Sqlite>,
}

impl SqlStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open a pool on `url`, creating the database file if needed.
    /// In-memory databases live as long as their connection, so they get a
    /// single connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?
        };

        tracing::info!("Connected to database");
        Ok(Self::new(pool))
    }

    /// Create the books table and its case-insensitive title/author index
    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id         TEXT PRIMARY KEY NOT NULL,
                title      TEXT NOT NULL,
                author     TEXT NOT NULL,
                quantity   INTEGER NOT NULL CHECK (quantity >= 0),
                title_key  TEXT NOT NULL,
                author_key TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS books_title_author_key
                ON books (title_key, author_key)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn find_like(&self, key_column: &'static str, needle: &str) -> StoreResult<Vec<Book>> {
        let query = format!(
            r"SELECT {COLUMNS} FROM books WHERE {key_column} LIKE ? ESCAPE '\' ORDER BY author, title, id"
        );
        let rows = sqlx::query_as::<_, Book>(&query)
            .bind(like_pattern(&needle.to_lowercase()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// `%needle%` with LIKE wildcards in the needle taken literally
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Quantities for which `quantity + delta` stays within `0..=i64::MAX`
fn accepted_range(delta: i64) -> Option<(i64, i64)> {
    if delta >= 0 {
        Some((0, i64::MAX - delta))
    } else {
        delta.checked_neg().map(|floor| (floor, i64::MAX))
    }
}

fn map_insert_error(err: sqlx::Error, book: &Book) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(format!(
            "'{}' by {} ({})",
            book.title,
            book.author,
            db.message()
        )),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl BookStore for SqlStore {
    async fn list(&self) -> StoreResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, Book>(&format!(
            "SELECT {COLUMNS} FROM books ORDER BY author, title, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, book: Book) -> StoreResult<String> {
        sqlx::query(
            "INSERT INTO books (id, title, author, quantity, title_key, author_key) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.quantity)
        .bind(book.title.to_lowercase())
        .bind(book.author.to_lowercase())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &book))?;
        Ok(book.id)
    }

    async fn update(&self, book: Book) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE books SET title = ?, author = ?, quantity = ?, title_key = ?, author_key = ? WHERE id = ?",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.quantity)
        .bind(book.title.to_lowercase())
        .bind(book.author.to_lowercase())
        .bind(&book.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &book))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(book.id));
        }
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> StoreResult<Vec<Book>> {
        self.find_like("title_key", title).await
    }

    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Book>> {
        self.find_like("author_key", author).await
    }

    async fn adjust_quantity(&self, id: &str, delta: i64) -> StoreResult<Book> {
        let updated = match accepted_range(delta) {
            Some((low, high)) => {
                sqlx::query_as::<_, Book>(&format!(
                    "UPDATE books SET quantity = quantity + ? \
                     WHERE id = ? AND quantity BETWEEN ? AND ? RETURNING {COLUMNS}"
                ))
                .bind(delta)
                .bind(id)
                .bind(low)
                .bind(high)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        match updated {
            Some(book) => Ok(book),
            // Nothing matched: the id is unknown or the result is out of range
            None => {
                let book = self.find_by_id(id).await?;
                adjusted_quantity(&book, delta)?;
                Err(StoreError::Exhausted(book.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlStore {
        let store = SqlStore::connect("sqlite::memory:", 1).await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("gat"), "%gat%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let store = store().await;
        store.init_schema().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let store = store().await;
        assert!(matches!(store.find_by_id("nope").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn unique_index_catches_title_author_in_any_case() {
        let store = store().await;
        store.create(Book::new("1", "Dune", "Herbert", 1)).await.unwrap();

        let err = store.create(Book::new("2", "DUNE", "herbert", 3)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let err = store.create(Book::new("1", "Emma", "Austen", 3)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_ascii_case_is_folded_like_the_other_stores() {
        let store = store().await;
        store.create(Book::new("1", "Élan Vital", "Henri Bergson", 1)).await.unwrap();

        assert_eq!(store.find_by_title("élan").await.unwrap().len(), 1);
        assert_eq!(store.find_by_title("ÉLAN VITAL").await.unwrap().len(), 1);

        let err = store.create(Book::new("2", "élan vital", "HENRI BERGSON", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn accepted_range_keeps_the_result_representable() {
        assert_eq!(accepted_range(1), Some((0, i64::MAX - 1)));
        assert_eq!(accepted_range(-1), Some((1, i64::MAX)));
        assert_eq!(accepted_range(i64::MIN), None);
    }

    #[tokio::test]
    async fn return_past_the_maximum_keeps_the_row_readable() {
        let store = store().await;
        store.create(Book::new("1", "Dune", "Herbert", i64::MAX)).await.unwrap();

        let err = store.adjust_quantity("1", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::QuantityOverflow(_)));

        assert_eq!(store.find_by_id("1").await.unwrap().quantity, i64::MAX);
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.adjust_quantity("1", -1).await.unwrap().quantity, i64::MAX - 1);
    }

    #[tokio::test]
    async fn huge_decrement_is_exhausted() {
        let store = store().await;
        store.create(Book::new("1", "Dune", "Herbert", i64::MAX)).await.unwrap();

        let err = store.adjust_quantity("1", i64::MIN).await.unwrap_err();
        assert!(matches!(err, StoreError::Exhausted(_)));
        assert_eq!(store.find_by_id("1").await.unwrap().quantity, i64::MAX);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let store = store().await;
        let err = store.update(Book::new("1", "Dune", "Herbert", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn like_wildcards_in_needle_are_literal() {
        let store = store().await;
        store.create(Book::new("1", "100% Cotton", "Anon", 1)).await.unwrap();
        store.create(Book::new("2", "1000 Cotton", "Anon", 1)).await.unwrap();

        let found = store.find_by_title("100%").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
    }

    #[tokio::test]
    async fn conditional_decrement_distinguishes_missing_and_exhausted() {
        let store = store().await;
        store.create(Book::new("1", "Dune", "Herbert", 1)).await.unwrap();

        assert_eq!(store.adjust_quantity("1", -1).await.unwrap().quantity, 0);
        assert!(matches!(store.adjust_quantity("1", -1).await, Err(StoreError::Exhausted(_))));
        assert!(matches!(store.adjust_quantity("2", -1).await, Err(StoreError::NotFound(_))));
        assert_eq!(store.find_by_id("1").await.unwrap().quantity, 0);
    }
}
