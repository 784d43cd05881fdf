//! API route definitions

use crate::handlers::{health, relationships};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness_check,
        relationships::relationships_handler
    ),
    components(schemas(
        health::HealthResponse,
        relationships::RelationshipRequest,
        relationships::RelationshipResponse,
        crate::error::ApiError
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "relationships", description = "Causal relation extraction")
    )
)]
pub struct ApiDoc;

/// Extraction routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/relationships", post(relationships::relationships_handler))
}

/// Health, readiness, metrics and the OpenAPI document
pub fn system_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}
