//! Version info endpoint, dispatched per API version

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, Method, Uri},
    response::Json,
};

use gatekeeper_core::application::headers::http_date;
use gatekeeper_core::domain::gatekeeper::VersionNegotiator;
use gatekeeper_core::{GateRequest, VersionContext, VersionRegistry};

use super::AppState;
use crate::presentation::models::{ApiError, VersionInfoResponse};

/// Builds the version info payload for one API version
pub type VersionHandler = fn(&VersionContext, &VersionNegotiator) -> VersionInfoResponse;

/// Registry holding the built-in handler of each version in `handled`.
/// Versions without a built-in handler are skipped.
pub fn version_registry(handled: &[String]) -> VersionRegistry<VersionHandler> {
    let mut registry = VersionRegistry::new();
    for version in handled {
        let handler: VersionHandler = match version.as_str() {
            "v1" => v1_info,
            "v2" => v2_info,
            other => {
                tracing::warn!(version = other, "No built-in version info handler");
                continue;
            }
        };
        registry.register(version.clone(), handler);
    }
    registry
}

fn info(
    context: &VersionContext,
    negotiator: &VersionNegotiator,
    endpoints: &[&str],
) -> VersionInfoResponse {
    VersionInfoResponse {
        version: context.resolved.clone(),
        requested: context.requested.clone(),
        source: context.source.as_str().to_string(),
        deprecated: context.deprecated,
        sunset: context.sunset.map(http_date),
        default_version: negotiator.default_version().to_string(),
        supported_versions: negotiator.supported_versions().to_vec(),
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
    }
}

fn v1_info(context: &VersionContext, negotiator: &VersionNegotiator) -> VersionInfoResponse {
    info(
        context,
        negotiator,
        &["/api/v1/version", "/api/v1/rate-limit/status"],
    )
}

fn v2_info(context: &VersionContext, negotiator: &VersionNegotiator) -> VersionInfoResponse {
    info(
        context,
        negotiator,
        &[
            "/api/v2/version",
            "/api/v2/rate-limit/status",
            "/api/v2/rate-limit/status?tier={tier}",
        ],
    )
}

/// GET /api/version and GET /api/{version}/version
pub async fn version_info(
    State(state): State<AppState>,
    context: Option<Extension<VersionContext>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<VersionInfoResponse>, ApiError> {
    let negotiator = state.gatekeeper.negotiator();
    let context = match context {
        Some(Extension(context)) => context,
        None => {
            let now_ms = state.gatekeeper.rate_limiter().now_millis();
            negotiator.negotiate(&GateRequest::new(&method, &uri, &headers), now_ms)?
        }
    };

    let handler = state.versions.dispatch(&context)?;
    Ok(Json(handler(&context, negotiator)))
}
