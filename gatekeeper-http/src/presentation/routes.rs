//! Route definitions

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::presentation::{
    controllers::{
        AppState, health::health_check, rate_limit::rate_limit_status, version::version_info,
    },
    middleware::{gatekeeper_middleware, logging_middleware},
    models::ApiError,
};

/// Create the API router with the gatekeeper in front of every route
pub fn create_router(state: AppState) -> Router {
    let gatekeeper = state.gatekeeper.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/rate-limit/status", get(rate_limit_status))
        .route("/api/{version}/rate-limit/status", get(rate_limit_status))
        .route("/api/version", get(version_info))
        .route("/api/{version}/version", get(version_info))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            gatekeeper,
            gatekeeper_middleware,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("The requested resource was not found")
}
