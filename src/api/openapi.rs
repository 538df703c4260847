//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "0.1.0",
        description = "Library catalog REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        health::health_check,
        auth::request_token,
        books::list_books,
        books::get_book,
        books::create_book,
        books::checkout_book,
        books::return_book,
    ),
    components(
        schemas(
            crate::models::auth::TokenRequest,
            crate::models::auth::TokenResponse,
            crate::models::book::Book,
            crate::models::book::BookRequest,
            crate::models::book::BookFilters,
            books::CreatedResponse,
            health::HealthResponse,
            crate::repository::StoreKind,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Client credentials tokens"),
        (name = "books", description = "Book catalog")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
