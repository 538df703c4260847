//! HTTP adapter: routes, extractors and handlers

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::auth::TokenClaims, AppState};

/// Extractor for a client authenticated by bearer token
pub struct AuthenticatedClient(pub TokenClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("missing bearer token".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("missing bearer token".to_string()))?;

        let claims = state.services.auth.validate(token)?;
        Ok(AuthenticatedClient(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/token", post(auth::request_token))
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:id", get(books::get_book))
        .route("/checkout", patch(books::checkout_book))
        .route("/return", patch(books::return_book))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
