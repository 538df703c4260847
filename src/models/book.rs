//! Book model and related request types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book record, identical in shape across every store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Opaque identifier, immutable once created
    pub id: String,
    pub title: String,
    pub author: String,
    /// Copies currently available for checkout
    pub quantity: i64,
}

impl Book {
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            quantity,
        }
    }

    /// Same title and author, ignoring case
    pub fn matches_title_author(&self, other: &Book) -> bool {
        self.title.to_lowercase() == other.title.to_lowercase()
            && self.author.to_lowercase() == other.author.to_lowercase()
    }

    /// Ordering used by every `list`/`find_by_*` result: author, then title, then id
    pub fn catalog_order(a: &Book, b: &Book) -> std::cmp::Ordering {
        a.author
            .cmp(&b.author)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Case-insensitive substring test shared by the in-process stores
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(range(min = 0, message = "Quantity must be greater than or equal to 0"))]
    pub quantity: i64,
}

impl BookRequest {
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if self.title.trim().is_empty() || self.author.trim().is_empty() {
            return Err(AppError::Validation("Title and author must not be blank".to_string()));
        }
        Ok(())
    }
}

/// Search filters for the book list. Title and author are mutually exclusive.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookFilters {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
}

impl BookFilters {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|s| !s.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref().filter(|s| !s.is_empty())
    }

    /// Reject a request carrying both filters
    pub fn check(&self) -> AppResult<()> {
        if self.title().is_some() && self.author().is_some() {
            return Err(AppError::InvalidFilter);
        }
        Ok(())
    }
}

/// Default catalog used when a memory or JSON store starts without data
pub fn seed_catalog() -> Vec<Book> {
    [
        ("In Search of Lost Time", "Marcel Proust", 2),
        ("The Great Gatsby", "F. Scott Fitzgerald", 5),
        ("War and Peace", "Leo Tolstoy", 6),
    ]
    .into_iter()
    .map(|(title, author, quantity)| Book::new(Uuid::new_v4().to_string(), title, author, quantity))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_author_match_ignores_case() {
        let a = Book::new("1", "Dune", "Herbert", 1);
        let b = Book::new("2", "DUNE", "herbert", 7);
        let c = Book::new("3", "Dune Messiah", "Herbert", 1);

        assert!(a.matches_title_author(&b));
        assert!(!a.matches_title_author(&c));
    }

    #[test]
    fn both_filters_are_rejected() {
        let filters = BookFilters {
            title: Some("aaa".into()),
            author: Some("bbb".into()),
        };
        assert!(matches!(filters.check(), Err(AppError::InvalidFilter)));
    }

    #[test]
    fn empty_filter_counts_as_absent() {
        let filters = BookFilters {
            title: Some(String::new()),
            author: Some("Tolstoy".into()),
        };
        assert!(filters.check().is_ok());
        assert_eq!(filters.title(), None);
        assert_eq!(filters.author(), Some("Tolstoy"));
    }

    #[test]
    fn request_requires_title_author_and_non_negative_quantity() {
        let ok = BookRequest { title: "Dune".into(), author: "Herbert".into(), quantity: 0 };
        assert!(ok.check().is_ok());

        let blank = BookRequest { title: "  ".into(), author: "Herbert".into(), quantity: 1 };
        assert!(matches!(blank.check(), Err(AppError::Validation(_))));

        let negative = BookRequest { title: "Dune".into(), author: "Herbert".into(), quantity: -1 };
        assert!(matches!(negative.check(), Err(AppError::Validation(_))));
    }

    #[test]
    fn seed_catalog_has_unique_ids() {
        let seed = seed_catalog();
        assert_eq!(seed.len(), 3);
        assert_ne!(seed[0].id, seed[1].id);
        assert_ne!(seed[1].id, seed[2].id);
    }
}
