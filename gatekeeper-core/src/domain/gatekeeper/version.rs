//! API version negotiation
//!
//! Precedence: `/api/vN/` path segment, then the version header, then the
//! version query parameter, then the configured default.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use http::HeaderName;
use serde::Serialize;

use super::errors::{GatekeeperError, LookupStage};
use super::request::GateRequest;
use crate::config::{ValidationError, VersioningConfig};

/// Where the negotiated version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    Path,
    Header,
    Query,
    Default,
}

impl VersionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionSource::Path => "path",
            VersionSource::Header => "header",
            VersionSource::Query => "query",
            VersionSource::Default => "default",
        }
    }
}

/// Outcome of version negotiation for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionContext {
    /// Value as supplied by the client
    pub requested: String,
    /// Normalized `vN` form
    pub resolved: String,
    pub supported: bool,
    pub deprecated: bool,
    pub source: VersionSource,
    /// Set for deprecated versions only
    pub sunset: Option<DateTime<Utc>>,
}

/// `true` for `v` followed by one or more ASCII digits
pub fn is_version_token(token: &str) -> bool {
    token
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Normalize a client-supplied version: trimmed, lower-cased, and a bare
/// number gains a `v` prefix. Returns `None` for anything else.
pub fn normalize_version(raw: &str) -> Option<String> {
    let candidate = raw.trim().to_ascii_lowercase();
    if candidate.is_empty() {
        return None;
    }
    let candidate = if candidate.bytes().all(|b| b.is_ascii_digit()) {
        format!("v{}", candidate)
    } else {
        candidate
    };
    is_version_token(&candidate).then_some(candidate)
}

/// Version segment of an `/api/vN` or `/api/vN/...` path
pub fn path_version(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/api/")?;
    let segment = rest.split('/').next()?;
    is_version_token(segment).then_some(segment)
}

/// Resolves and validates the API version of each request
#[derive(Debug, Clone)]
pub struct VersionNegotiator {
    supported: Vec<String>,
    deprecated: Vec<String>,
    default_version: String,
    header: HeaderName,
    query_param: String,
    sunset_after: TimeDelta,
}

impl VersionNegotiator {
    pub fn new(config: &VersioningConfig) -> Result<Self, ValidationError> {
        let header = HeaderName::from_bytes(config.header.as_bytes()).map_err(|_| {
            ValidationError::versioning(format!("Invalid version header name '{}'", config.header))
        })?;

        Ok(Self {
            supported: config.supported.clone(),
            deprecated: config.deprecated.clone(),
            default_version: config.default_version.clone(),
            header,
            query_param: config.query_param.clone(),
            sunset_after: TimeDelta::days(i64::from(config.sunset_days)),
        })
    }

    pub fn supported_versions(&self) -> &[String] {
        &self.supported
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn is_supported(&self, version: &str) -> bool {
        self.supported.iter().any(|v| v == version)
    }

    pub fn is_deprecated(&self, version: &str) -> bool {
        self.deprecated.iter().any(|v| v == version)
    }

    /// Normalized version requested by the client, or the default
    pub fn extract_version(&self, request: &GateRequest<'_>) -> Result<String, GatekeeperError> {
        self.extract(request).map(|(_, resolved, _)| resolved)
    }

    /// Resolve and validate. Unsupported versions are an error; deprecated
    /// ones succeed with a sunset date.
    pub fn negotiate(
        &self,
        request: &GateRequest<'_>,
        now_ms: u64,
    ) -> Result<VersionContext, GatekeeperError> {
        let (requested, resolved, source) = self.extract(request)?;

        if !self.is_supported(&resolved) {
            return Err(GatekeeperError::UnsupportedVersion {
                requested: resolved,
                supported: self.supported.clone(),
            });
        }

        let deprecated = self.is_deprecated(&resolved);
        let sunset = if deprecated {
            DateTime::<Utc>::from_timestamp_millis(now_ms as i64)
                .and_then(|now| now.checked_add_signed(self.sunset_after))
        } else {
            None
        };

        Ok(VersionContext {
            requested,
            resolved,
            supported: true,
            deprecated,
            source,
            sunset,
        })
    }

    fn extract(
        &self,
        request: &GateRequest<'_>,
    ) -> Result<(String, String, VersionSource), GatekeeperError> {
        if let Some(version) = path_version(request.path()) {
            return Ok((version.to_string(), version.to_string(), VersionSource::Path));
        }

        if let Some(value) = request.header_value(self.header.as_str()) {
            let raw = value
                .to_str()
                .map_err(|_| self.malformed("header value is not valid UTF-8"))?;
            if !raw.trim().is_empty() {
                return self.normalized(raw, VersionSource::Header);
            }
        }

        if let Some(raw) = request.query_param(&self.query_param)
            && !raw.trim().is_empty()
        {
            return self.normalized(&raw, VersionSource::Query);
        }

        Ok((
            self.default_version.clone(),
            self.default_version.clone(),
            VersionSource::Default,
        ))
    }

    fn normalized(
        &self,
        raw: &str,
        source: VersionSource,
    ) -> Result<(String, String, VersionSource), GatekeeperError> {
        match normalize_version(raw) {
            Some(resolved) => Ok((raw.trim().to_string(), resolved, source)),
            None => Err(self.malformed(&format!(
                "'{}' from {} is not a valid version",
                raw.trim(),
                source.as_str()
            ))),
        }
    }

    fn malformed(&self, reason: &str) -> GatekeeperError {
        GatekeeperError::InternalLookupFailure {
            stage: LookupStage::Version,
            reason: reason.to_string(),
            supported: self.supported.clone(),
        }
    }
}

/// Per-version handler table.
///
/// A version may be supported by the negotiator and still have no handler
/// here; dispatching it yields [`GatekeeperError::VersionHandlerMissing`].
#[derive(Debug, Clone)]
pub struct VersionRegistry<H> {
    handlers: HashMap<String, H>,
}

impl<H> Default for VersionRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<H> VersionRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `version`, returning any handler it replaces
    pub fn register(&mut self, version: impl Into<String>, handler: H) -> Option<H> {
        self.handlers.insert(version.into(), handler)
    }

    pub fn with(mut self, version: impl Into<String>, handler: H) -> Self {
        self.register(version, handler);
        self
    }

    pub fn get(&self, version: &str) -> Option<&H> {
        self.handlers.get(version)
    }

    pub fn dispatch(&self, context: &VersionContext) -> Result<&H, GatekeeperError> {
        self.handlers
            .get(&context.resolved)
            .ok_or_else(|| GatekeeperError::VersionHandlerMissing {
                version: context.resolved.clone(),
            })
    }

    /// Registered versions, sorted
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }
}
