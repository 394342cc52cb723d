//! Application setup and wiring

use std::sync::Arc;

use axum::Router;
use gatekeeper_core::config::ValidationError;
use gatekeeper_core::{Config, Gatekeeper, SystemClock};
use gatekeeper_http::{AppState, create_router};

/// Error raised while assembling the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid gatekeeper configuration: {0}")]
    Config(#[from] ValidationError),
}

/// Build the router for `config`, with a fresh in-memory counter store
pub fn create_app(config: &Config) -> Result<Router, AppError> {
    let gatekeeper = Arc::new(Gatekeeper::from_config(config, Arc::new(SystemClock))?);

    tracing::info!(
        strategy = %gatekeeper.rate_limiter().strategy(),
        rate_limiting = gatekeeper.rate_limiter().is_enabled(),
        versions = ?gatekeeper.negotiator().supported_versions(),
        "Gatekeeper initialized"
    );

    let state = AppState::new(gatekeeper, &config.versioning.handled);
    Ok(create_router(state))
}
