//! In-process store backed by a map behind a reader/writer lock

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{adjusted_quantity, BookStore, StoreError, StoreResult};
use crate::models::book::{contains_ignore_case, Book};

/// Map-backed store for small catalogs. Reads share the lock, writes take it
/// exclusively, so no caller observes a half-applied write.
pub struct MemoryStore {
    books: RwLock<HashMap<String, Book>>,
}

impl MemoryStore {
    pub fn new(seed: Vec<Book>) -> Self {
        let books = seed.into_iter().map(|b| (b.id.clone(), b)).collect();
        Self {
            books: RwLock::new(books),
        }
    }
}

/// Collect matching books in catalog order
pub(crate) fn collect_sorted<'a>(
    books: impl Iterator<Item = &'a Book>,
    keep: impl Fn(&Book) -> bool,
) -> Vec<Book> {
    let mut out: Vec<Book> = books.filter(|b| keep(*b)).cloned().collect();
    out.sort_by(Book::catalog_order);
    out
}

/// Shared duplicate rule: same id, or same title+author ignoring case
pub(crate) fn check_duplicate<'a>(
    mut existing: impl Iterator<Item = &'a Book>,
    candidate: &Book,
) -> StoreResult<()> {
    existing.try_for_each(|current| {
        if current.id == candidate.id {
            Err(StoreError::Duplicate(format!("id {}", candidate.id)))
        } else if current.matches_title_author(candidate) {
            Err(StoreError::Duplicate(format!(
                "'{}' by {}",
                candidate.title, candidate.author
            )))
        } else {
            Ok(())
        }
    })
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        Ok(collect_sorted(books.values(), |_| true))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Book> {
        let books = self.books.read().await;
        books
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, book: Book) -> StoreResult<String> {
        let mut books = self.books.write().await;
        check_duplicate(books.values(), &book)?;

        let id = book.id.clone();
        books.insert(id.clone(), book);
        Ok(id)
    }

    async fn update(&self, book: Book) -> StoreResult<()> {
        let mut books = self.books.write().await;
        if !books.contains_key(&book.id) {
            return Err(StoreError::NotFound(book.id));
        }
        check_duplicate(books.values().filter(|b| b.id != book.id), &book)?;

        books.insert(book.id.clone(), book);
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        Ok(collect_sorted(books.values(), |b| contains_ignore_case(&b.title, title)))
    }

    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Book>> {
        let books = self.books.read().await;
        Ok(collect_sorted(books.values(), |b| contains_ignore_case(&b.author, author)))
    }

    async fn adjust_quantity(&self, id: &str, delta: i64) -> StoreResult<Book> {
        let mut books = self.books.write().await;
        let book = books
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        book.quantity = adjusted_quantity(book, delta)?;
        Ok(book.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn dune() -> Book {
        Book::new("1", "Dune", "Herbert", 1)
    }

    #[tokio::test]
    async fn list_is_ordered_by_author() {
        let store = MemoryStore::new(vec![
            Book::new("a", "War and Peace", "Leo Tolstoy", 6),
            Book::new("b", "The Great Gatsby", "F. Scott Fitzgerald", 5),
            Book::new("c", "In Search of Lost Time", "Marcel Proust", 2),
        ]);

        let authors: Vec<String> = store.list().await.unwrap().into_iter().map(|b| b.author).collect();
        assert_eq!(authors, vec!["F. Scott Fitzgerald", "Leo Tolstoy", "Marcel Proust"]);
    }

    #[tokio::test]
    async fn create_rejects_same_id() {
        let store = MemoryStore::new(vec![dune()]);
        let err = store.create(Book::new("1", "Emma", "Austen", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn create_rejects_same_title_author_in_any_case() {
        let store = MemoryStore::new(vec![dune()]);
        let err = store.create(Book::new("2", "dUNE", "HERBERT", 5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.list().await.unwrap(), vec![dune()]);
    }

    #[tokio::test]
    async fn update_missing_book_is_not_found() {
        let store = MemoryStore::new(vec![]);
        let err = store.update(dune()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "1"));
    }

    #[tokio::test]
    async fn update_replaces_the_whole_record() {
        let store = MemoryStore::new(vec![dune()]);
        let changed = Book::new("1", "Dune Messiah", "Frank Herbert", 9);
        store.update(changed.clone()).await.unwrap();
        assert_eq!(store.find_by_id("1").await.unwrap(), changed);
    }

    #[tokio::test]
    async fn adjust_quantity_stops_at_zero() {
        let store = MemoryStore::new(vec![dune()]);
        assert_eq!(store.adjust_quantity("1", -1).await.unwrap().quantity, 0);

        let err = store.adjust_quantity("1", -1).await.unwrap_err();
        assert!(matches!(err, StoreError::Exhausted(_)));
        assert_eq!(store.find_by_id("1").await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn return_past_the_maximum_is_refused() {
        let store = MemoryStore::new(vec![Book::new("1", "Dune", "Herbert", i64::MAX)]);

        let err = store.adjust_quantity("1", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::QuantityOverflow(_)));
        assert_eq!(store.find_by_id("1").await.unwrap().quantity, i64::MAX);
    }

    #[tokio::test]
    async fn concurrent_checkouts_never_oversell() {
        let store = Arc::new(MemoryStore::new(vec![Book::new("1", "Dune", "Herbert", 5)]));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.adjust_quantity("1", -1).await.is_ok() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(store.find_by_id("1").await.unwrap().quantity, 0);
    }
}
