//! Ordered, short-circuiting request gate
//!
//! Stages run in a fixed order and the first refusing stage ends the
//! evaluation:
//!
//! 1. preflight (`OPTIONS`) answered with CORS headers only
//! 2. exempt paths forwarded without rate limiting or version checks
//! 3. version negotiation, failing closed
//! 4. tier resolution
//! 5. rate limiting, failing open; uncounted paths skip it
//! 6. header composition and pass-through

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use tracing::{debug, warn};

use super::headers::HeaderComposer;
use crate::config::{Config, ValidationError};
use crate::domain::gatekeeper::{
    ClientIdentity, ErrorBody, GateRequest, GatekeeperError, LookupStage, TierName, TierResolver,
    VersionContext, VersionNegotiator,
};
use crate::infrastructure::clock::Clock;
use crate::infrastructure::rate_limiter::{RateLimitDecision, RateLimiterService};

/// A response produced by the gatekeeper itself
#[derive(Debug, Clone)]
pub struct GateResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` for preflight responses
    pub body: Option<ErrorBody>,
}

/// Everything a downstream handler may need from the gate
#[derive(Debug, Clone)]
pub struct ForwardContext {
    pub identity: ClientIdentity,
    /// `None` for exempt requests
    pub tier: Option<TierName>,
    /// `None` for exempt requests
    pub version: Option<VersionContext>,
    /// `None` when exempt, disabled, or the limiter failed open
    pub decision: Option<RateLimitDecision>,
    /// Headers to merge into the handler's response
    pub headers: HeaderMap,
    pub exempt: bool,
}

/// Result of gating one request
#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// Terminal: answer with this response, never call the handler
    Respond(GateResponse),
    /// Pass the request on
    Forward(ForwardContext),
}

/// The gatekeeping pipeline
pub struct Gatekeeper {
    tiers: TierResolver,
    versions: VersionNegotiator,
    headers: HeaderComposer,
    rate_limiter: Arc<RateLimiterService>,
    clock: Arc<dyn Clock>,
}

impl Gatekeeper {
    /// Build the pipeline around an existing limiter, sharing its clock
    pub fn new(
        config: &Config,
        rate_limiter: Arc<RateLimiterService>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            tiers: TierResolver::from_config(&config.rate_limit),
            versions: VersionNegotiator::new(&config.versioning)?,
            headers: HeaderComposer::new(&config.security)?,
            clock: rate_limiter.clock(),
            rate_limiter,
        })
    }

    /// Build the pipeline and its in-memory limiter from configuration
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, ValidationError> {
        let rate_limiter =
            RateLimiterService::new(config.rate_limit.clone(), &config.store, clock)?;
        Self::new(config, Arc::new(rate_limiter))
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiterService> {
        &self.rate_limiter
    }

    pub fn tier_resolver(&self) -> &TierResolver {
        &self.tiers
    }

    pub fn negotiator(&self) -> &VersionNegotiator {
        &self.versions
    }

    pub fn evaluate(&self, request: &GateRequest<'_>) -> GateOutcome {
        let origin = request.header("origin");

        if request.is_preflight() {
            debug!(path = %request.path(), "Answering preflight request");
            return GateOutcome::Respond(GateResponse {
                status: StatusCode::OK,
                headers: self.headers.preflight(origin),
                body: None,
            });
        }

        let mut headers = HeaderMap::new();
        self.headers.apply_cors(origin, &mut headers);
        self.headers.apply_security(&mut headers);

        let identity = ClientIdentity::resolve(request.headers());

        if self.tiers.is_exempt(request.path()) {
            debug!(path = %request.path(), "Exempt path, skipping rate limit and version checks");
            return GateOutcome::Forward(ForwardContext {
                identity,
                tier: None,
                version: None,
                decision: None,
                headers,
                exempt: true,
            });
        }

        let now_ms = self.clock.now_millis();

        let version = match self.negotiate_version(request, now_ms) {
            Ok(version) => version,
            Err(err) => return Self::reject(&err, headers),
        };
        HeaderComposer::apply_version(&version, &mut headers);

        let tier = self.tiers.resolve(request);

        let decision = if self.tiers.is_uncounted(request.path()) {
            debug!(path = %request.path(), tier = %tier, "Uncounted path, skipping rate limit");
            None
        } else {
            match self.enforce_rate_limit(&identity, tier, now_ms, &mut headers) {
                Ok(decision) => decision,
                Err(err) if !err.is_terminal() => {
                    warn!(identity = %identity, tier = %tier, "{}, allowing request", err);
                    None
                }
                Err(err) => return Self::reject(&err, headers),
            }
        };

        GateOutcome::Forward(ForwardContext {
            identity,
            tier: Some(tier),
            version: Some(version),
            decision,
            headers,
            exempt: false,
        })
    }

    /// Fail-closed branch: malformed or unsupported versions end the request.
    fn negotiate_version(
        &self,
        request: &GateRequest<'_>,
        now_ms: u64,
    ) -> Result<VersionContext, GatekeeperError> {
        let version = self.versions.negotiate(request, now_ms)?;
        if version.deprecated {
            debug!(
                version = %version.resolved,
                path = %request.path(),
                "Deprecated API version requested"
            );
        }
        Ok(version)
    }

    /// Fail-open branch: a limiter failure comes back as a non-terminal
    /// error and the request passes without rate limit headers.
    fn enforce_rate_limit(
        &self,
        identity: &ClientIdentity,
        tier: TierName,
        now_ms: u64,
        headers: &mut HeaderMap,
    ) -> Result<Option<RateLimitDecision>, GatekeeperError> {
        if !self.rate_limiter.is_enabled() {
            return Ok(None);
        }

        let decision = self
            .rate_limiter
            .check_at(identity, tier, now_ms)
            .map_err(|e| GatekeeperError::InternalLookupFailure {
                stage: LookupStage::RateLimit,
                reason: e.to_string(),
                supported: Vec::new(),
            })?;

        HeaderComposer::apply_rate_limit(&decision, headers);

        if decision.allowed {
            return Ok(Some(decision));
        }

        let retry_after_secs = decision.retry_after_secs(now_ms);
        HeaderComposer::apply_retry_after(retry_after_secs, headers);

        warn!(
            identity = %identity,
            tier = %tier,
            limit = decision.limit,
            retry_after = retry_after_secs,
            "Rate limit exceeded"
        );

        Err(GatekeeperError::RateLimitExceeded {
            tier,
            limit: decision.limit,
            reset_at_ms: decision.reset_at_ms,
            retry_after_secs,
            message: self.rate_limiter.quota(tier).message.clone(),
        })
    }

    fn reject(err: &GatekeeperError, headers: HeaderMap) -> GateOutcome {
        debug!(code = err.code(), "Request rejected by gatekeeper: {}", err);
        GateOutcome::Respond(GateResponse {
            status: err.status_code(),
            headers,
            body: Some(err.to_body()),
        })
    }
}
