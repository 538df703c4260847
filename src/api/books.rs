//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilters, BookRequest},
    AppState,
};

use super::AuthenticatedClient;

/// `?id=` query of the checkout and return endpoints
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookIdQuery {
    /// Book ID
    pub id: Option<String>,
}

impl BookIdQuery {
    fn require(self) -> AppResult<String> {
        self.id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("No id sent".to_string()))
    }
}

/// Response of a successful creation
#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: String,
}

/// List books, optionally filtered by title or author
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookFilters),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>),
        (status = 400, description = "Both title and author filters given")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(filters): Query<BookFilters>,
) -> AppResult<Json<Vec<Book>>> {
    filters.check()?;

    let books = state.services.books.find_all(&filters).await?;
    Ok(Json(books))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_by_id(&id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = CreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Book already exists")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedClient(claims): AuthenticatedClient,
    Json(request): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    tracing::debug!(client_id = %claims.cid, "Create book request");

    let id = state.services.books.create(request).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Check out one copy of a book
#[utoipa::path(
    patch,
    path = "/checkout",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookIdQuery),
    responses(
        (status = 200, description = "Book checked out", body = Book),
        (status = 400, description = "Missing id or no copy available"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn checkout_book(
    State(state): State<AppState>,
    AuthenticatedClient(_claims): AuthenticatedClient,
    Query(query): Query<BookIdQuery>,
) -> AppResult<Json<Book>> {
    let id = query.require()?;
    let book = state.services.books.checkout(&id).await?;
    Ok(Json(book))
}

/// Return one copy of a book
#[utoipa::path(
    patch,
    path = "/return",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookIdQuery),
    responses(
        (status = 200, description = "Book returned", body = Book),
        (status = 400, description = "Missing id"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedClient(_claims): AuthenticatedClient,
    Query(query): Query<BookIdQuery>,
) -> AppResult<Json<Book>> {
    let id = query.require()?;
    let book = state.services.books.return_book(&id).await?;
    Ok(Json(book))
}
