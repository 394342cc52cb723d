//! Security, CORS, rate limit and version response headers

use chrono::{DateTime, Utc};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::config::{SecurityConfig, ValidationError};
use crate::domain::gatekeeper::VersionContext;
use crate::infrastructure::rate_limiter::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
pub const X_API_VERSION: HeaderName = HeaderName::from_static("x-api-version");
pub const X_API_DEPRECATION: HeaderName = HeaderName::from_static("x-api-deprecation");
pub const SUNSET: HeaderName = HeaderName::from_static("sunset");
pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

const EXPOSED_HEADERS: &str = "x-ratelimit-limit, x-ratelimit-remaining, x-ratelimit-reset, \
                               retry-after, x-api-version, x-api-deprecation, sunset";

/// IMF-fixdate, as used by `Sunset` and `Date`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Builds the headers the gatekeeper owns on every response
#[derive(Debug, Clone)]
pub struct HeaderComposer {
    enabled: bool,
    any_origin: bool,
    allowed_origins: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
    frame_options: HeaderValue,
    xss_protection: HeaderValue,
    referrer_policy: HeaderValue,
    permissions_policy: HeaderValue,
}

impl HeaderComposer {
    pub fn new(config: &SecurityConfig) -> Result<Self, ValidationError> {
        let value = |name: &str, raw: &str| {
            HeaderValue::from_str(raw).map_err(|_| {
                ValidationError::security(format!(
                    "{} is not a valid header value: '{}'",
                    name, raw
                ))
            })
        };

        Ok(Self {
            enabled: config.enabled,
            any_origin: config.allowed_origins.iter().any(|o| o == "*"),
            allowed_origins: config.allowed_origins.clone(),
            allow_methods: value("allowed_methods", &config.allowed_methods.join(", "))?,
            allow_headers: value("allowed_headers", &config.allowed_headers.join(", "))?,
            max_age: HeaderValue::from(config.max_age_seconds),
            frame_options: value("frame_options", &config.frame_options)?,
            xss_protection: value("xss_protection", &config.xss_protection)?,
            referrer_policy: value("referrer_policy", &config.referrer_policy)?,
            permissions_policy: value("permissions_policy", &config.permissions_policy)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// CORS headers for a request from `origin`.
    ///
    /// With a wildcard allow-list every origin gets `*`; otherwise an
    /// allow-listed origin is echoed back and unknown origins get no
    /// allow-origin header at all.
    pub fn apply_cors(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        if !self.enabled {
            return;
        }

        if self.any_origin {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
        } else {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
            if let Some(origin) = origin
                && self.allowed_origins.iter().any(|allowed| allowed == origin)
                && let Ok(value) = HeaderValue::from_str(origin)
            {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }

        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            self.allow_methods.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            self.allow_headers.clone(),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSED_HEADERS),
        );
    }

    /// Hardening headers
    pub fn apply_security(&self, headers: &mut HeaderMap) {
        if !self.enabled {
            return;
        }

        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        headers.insert(header::X_FRAME_OPTIONS, self.frame_options.clone());
        headers.insert(header::X_XSS_PROTECTION, self.xss_protection.clone());
        headers.insert(header::REFERRER_POLICY, self.referrer_policy.clone());
        headers.insert(PERMISSIONS_POLICY, self.permissions_policy.clone());
    }

    /// Headers for a preflight response: CORS only
    pub fn preflight(&self, origin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.apply_cors(origin, &mut headers);
        headers
    }

    pub fn apply_rate_limit(decision: &RateLimitDecision, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at_secs()));
    }

    pub fn apply_retry_after(retry_after_secs: u64, headers: &mut HeaderMap) {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    }

    pub fn apply_version(context: &VersionContext, headers: &mut HeaderMap) {
        match HeaderValue::from_str(&context.resolved) {
            Ok(value) => {
                headers.insert(X_API_VERSION, value);
            }
            Err(e) => warn!("Failed to encode API version header: {}", e),
        }

        if context.deprecated {
            headers.insert(X_API_DEPRECATION, HeaderValue::from_static("true"));
            if let Some(sunset) = context.sunset
                && let Ok(value) = HeaderValue::from_str(&http_date(sunset))
            {
                headers.insert(SUNSET, value);
            }
        }
    }

    /// Copy gatekeeper-owned headers onto a handler response.
    ///
    /// Gatekeeper headers replace same-named handler headers, except `Vary`
    /// which is appended.
    pub fn merge_into(gate_headers: &HeaderMap, response_headers: &mut HeaderMap) {
        for name in gate_headers.keys() {
            if *name == header::VARY {
                for value in gate_headers.get_all(name) {
                    response_headers.append(name.clone(), value.clone());
                }
                continue;
            }
            response_headers.remove(name);
            for value in gate_headers.get_all(name) {
                response_headers.append(name.clone(), value.clone());
            }
        }
    }
}

/// Format a timestamp as an IMF-fixdate
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}
