//! API controllers

pub mod health;
pub mod rate_limit;
pub mod version;

use std::sync::Arc;

use gatekeeper_core::{Gatekeeper, VersionRegistry};

use self::version::VersionHandler;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub versions: Arc<VersionRegistry<VersionHandler>>,
}

impl AppState {
    /// Handlers are registered for each of `handled` that has a built-in
    /// implementation.
    pub fn new(gatekeeper: Arc<Gatekeeper>, handled: &[String]) -> Self {
        Self {
            gatekeeper,
            versions: Arc::new(version::version_registry(handled)),
        }
    }
}
