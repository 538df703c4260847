//! Book catalog service: identity assignment and the checkout/return rules

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilters, BookRequest},
    repository::BookStore,
};

#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// List books, narrowed by title or by author when a filter is given.
    /// Callers reject requests carrying both filters.
    pub async fn find_all(&self, filters: &BookFilters) -> AppResult<Vec<Book>> {
        if let Some(title) = filters.title() {
            return self
                .store
                .find_by_title(title)
                .await
                .map_err(|e| AppError::from_store("store.find_by_title", e));
        }

        if let Some(author) = filters.author() {
            return self
                .store
                .find_by_author(author)
                .await
                .map_err(|e| AppError::from_store("store.find_by_author", e));
        }

        self.store
            .list()
            .await
            .map_err(|e| AppError::from_store("store.list", e))
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Book> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| AppError::from_store("store.find_by_id", e))
    }

    /// Create a book under a freshly generated id
    pub async fn create(&self, request: BookRequest) -> AppResult<String> {
        request.check()?;

        let book = Book::new(
            Uuid::new_v4().to_string(),
            request.title,
            request.author,
            request.quantity,
        );

        match self.store.create(book).await {
            Ok(id) => {
                tracing::info!(book_id = %id, "Book created");
                Ok(id)
            }
            Err(e) => {
                let err = AppError::from_store("store.create", e);
                tracing::warn!("Book creation rejected: {}", err);
                Err(err)
            }
        }
    }

    /// Take one copy out. Fails with `BookUnavailable` when none is left.
    pub async fn checkout(&self, id: &str) -> AppResult<Book> {
        let book = self.adjust(id, -1, "Checkout").await?;
        tracing::info!(book_id = %id, remaining = book.quantity, "Book checked out");
        Ok(book)
    }

    /// Give one copy back. There is no ceiling on the quantity.
    pub async fn return_book(&self, id: &str) -> AppResult<Book> {
        let book = self.adjust(id, 1, "Return").await?;
        tracing::info!(book_id = %id, remaining = book.quantity, "Book returned");
        Ok(book)
    }

    async fn adjust(&self, id: &str, delta: i64, action: &str) -> AppResult<Book> {
        match self.store.adjust_quantity(id, delta).await {
            Ok(book) => Ok(book),
            Err(e) => {
                let err = AppError::from_store("store.update", e);
                tracing::warn!(book_id = %id, "{} refused: {}", action, err);
                Err(err)
            }
        }
    }
}
