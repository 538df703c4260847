//! Liveness endpoint reporting the build and the active store

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{repository::StoreKind, AppState};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Backend selected at startup
    pub store: StoreKind,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: state.config.storage.kind,
    })
}
