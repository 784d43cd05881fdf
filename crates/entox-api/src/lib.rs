//! Entox API - REST server for causal relation extraction
//!
//! `POST /relationships` takes `{text, cause, effect}` and answers with the
//! relations found, or "No relationship found".

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .merge(routes::system_routes())
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http());

    let router = if state.config.server.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}
