//! Health check endpoint

use crate::ApiState;
use axum::extract::State;
use axum::{response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the tenant registry is reachable. "ready" once the
    /// registry has been ensured, "unavailable" otherwise.
    pub registry: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let registry = if state.directory.registry_ready().await {
        "ready"
    } else {
        "unavailable"
    };
    Json(HealthResponse {
        status: "healthy".into(),
        registry: registry.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
