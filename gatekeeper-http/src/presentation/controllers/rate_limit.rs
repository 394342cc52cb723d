//! Informational rate limit status endpoint

use axum::{
    extract::{Extension, Query, State},
    http::{HeaderMap, Method, Uri},
    response::Json,
};
use chrono::DateTime;
use serde::Deserialize;

use gatekeeper_core::{ClientIdentity, GateRequest, GatekeeperError, TierName};
use gatekeeper_core::domain::gatekeeper::LookupStage;

use super::AppState;
use crate::presentation::models::{ApiError, RateLimitStatusResponse};

#[derive(Debug, Deserialize)]
pub struct RateLimitStatusQuery {
    /// Report on this tier instead of the one the request resolved to
    pub tier: Option<String>,
}

/// GET /api/rate-limit/status
///
/// Reads the caller's counters without consuming quota. The path is listed
/// under `rate_limit.routes.uncounted`, so the gatekeeper checks its version
/// but does not count it.
pub async fn rate_limit_status(
    State(state): State<AppState>,
    identity: Option<Extension<ClientIdentity>>,
    resolved_tier: Option<Extension<TierName>>,
    Query(query): Query<RateLimitStatusQuery>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<RateLimitStatusResponse>, ApiError> {
    let identity = match identity {
        Some(Extension(identity)) => identity,
        None => ClientIdentity::resolve(&headers),
    };

    let tier = match (query.tier, resolved_tier) {
        (Some(raw), _) => raw.parse::<TierName>().map_err(|e| {
            let valid: Vec<&str> = TierName::ALL.iter().map(|t| t.as_str()).collect();
            ApiError::bad_request(
                "INVALID_TIER",
                format!("{}; expected one of: {}", e, valid.join(", ")),
            )
        })?,
        (None, Some(Extension(tier))) => tier,
        (None, None) => state
            .gatekeeper
            .tier_resolver()
            .resolve(&GateRequest::new(&method, &uri, &headers)),
    };

    let limiter = state.gatekeeper.rate_limiter();
    let usage = limiter.status(&identity, tier).map_err(|e| {
        tracing::warn!(identity = %identity, tier = %tier, "Rate limit status unavailable: {}", e);
        GatekeeperError::InternalLookupFailure {
            stage: LookupStage::RateLimit,
            reason: e.to_string(),
            supported: Vec::new(),
        }
    })?;

    let reset_at = if limiter.is_enabled() {
        i64::try_from(usage.reset_at_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    } else {
        None
    };

    Ok(Json(RateLimitStatusResponse {
        identity: identity.to_string(),
        tier: usage.tier,
        limit: usage.limit,
        used: usage.used,
        remaining: usage.remaining,
        reset_at,
        window_ms: usage.window_ms,
        strategy: limiter.strategy().as_str().to_string(),
    }))
}
