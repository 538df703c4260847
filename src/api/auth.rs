//! Token endpoint

use axum::{extract::State, Form, Json};

use crate::{
    error::AppResult,
    models::auth::{TokenRequest, TokenResponse},
    AppState,
};

/// Exchange client credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "auth",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Unsupported grant type"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn request_token(
    State(state): State<AppState>,
    Form(request): Form<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state.services.auth.issue_token(&request)?;
    Ok(Json(token))
}
