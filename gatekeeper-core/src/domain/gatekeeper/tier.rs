//! Quota tier resolution

use std::borrow::Cow;
use std::str::FromStr;

use http::Method;
use serde::{Deserialize, Serialize};

use super::request::GateRequest;
use crate::config::{RateLimitConfig, RouteClassConfig, TieringMode};

pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Named quota tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierName {
    Anonymous,
    Authenticated,
    Premium,
    Api,
    Auth,
    Search,
    Write,
}

impl TierName {
    pub const ALL: [TierName; 7] = [
        TierName::Anonymous,
        TierName::Authenticated,
        TierName::Premium,
        TierName::Api,
        TierName::Auth,
        TierName::Search,
        TierName::Write,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Anonymous => "anonymous",
            TierName::Authenticated => "authenticated",
            TierName::Premium => "premium",
            TierName::Api => "api",
            TierName::Auth => "auth",
            TierName::Search => "search",
            TierName::Write => "write",
        }
    }
}

impl std::fmt::Display for TierName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown rate limit tier '{0}'")]
pub struct UnknownTierError(pub String);

impl FromStr for TierName {
    type Err = UnknownTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TierName::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTierError(s.to_string()))
    }
}

/// Maps a request to its quota tier and decides exemptions
#[derive(Debug, Clone)]
pub struct TierResolver {
    mode: TieringMode,
    routes: RouteClassConfig,
}

impl TierResolver {
    pub fn new(mode: TieringMode, routes: RouteClassConfig) -> Self {
        Self { mode, routes }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.tiering, config.routes.clone())
    }

    /// Exempt paths skip rate limiting and version negotiation.
    ///
    /// `/api/v1/health` is exempt whenever `/api/health` is.
    pub fn is_exempt(&self, path: &str) -> bool {
        matches_any(&self.routes.exempt, path)
    }

    /// Uncounted paths are version checked but never consume quota.
    pub fn is_uncounted(&self, path: &str) -> bool {
        matches_any(&self.routes.uncounted, path)
    }

    pub fn resolve(&self, request: &GateRequest<'_>) -> TierName {
        match self.mode {
            TieringMode::Credential => Self::resolve_by_credential(request),
            TieringMode::Route => self.resolve_by_route(request.method(), request.path()),
        }
    }

    /// The role hint only upgrades a request that already carries a
    /// credential.
    fn resolve_by_credential(request: &GateRequest<'_>) -> TierName {
        let has_credential = ["x-api-key", "authorization", "x-user-id"]
            .iter()
            .any(|name| request.header(name).is_some());

        if !has_credential {
            return TierName::Anonymous;
        }

        if request
            .header(USER_ROLE_HEADER)
            .is_some_and(|role| role.eq_ignore_ascii_case("premium"))
        {
            TierName::Premium
        } else {
            TierName::Authenticated
        }
    }

    fn resolve_by_route(&self, method: &Method, path: &str) -> TierName {
        let path = strip_version_segment(path);
        let under = |prefixes: &[String]| prefixes.iter().any(|p| has_prefix(&path, p));

        if under(&self.routes.auth) {
            return TierName::Auth;
        }

        let is_read = *method == Method::GET || *method == Method::HEAD;
        if is_read && under(&self.routes.search) {
            return TierName::Search;
        }

        let is_write = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE]
            .iter()
            .any(|m| m == method);
        if is_write {
            return TierName::Write;
        }

        TierName::Api
    }
}

/// Match `path` against `prefixes`, with and without its version segment
fn matches_any(prefixes: &[String], path: &str) -> bool {
    let unversioned = strip_version_segment(path);
    prefixes
        .iter()
        .any(|prefix| has_prefix(path, prefix) || has_prefix(&unversioned, prefix))
}

/// Segment-aware prefix match: `/api/auth` matches `/api/auth/login` but
/// not `/api/authors`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Remove a `/vN` segment directly after `/api`: `/api/v2/search` becomes
/// `/api/search`.
pub fn strip_version_segment(path: &str) -> Cow<'_, str> {
    let Some(rest) = path.strip_prefix("/api/") else {
        return Cow::Borrowed(path);
    };
    let (segment, tail) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    if super::version::is_version_token(segment) {
        Cow::Owned(format!("/api{}", tail))
    } else {
        Cow::Borrowed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_resolver() -> TierResolver {
        TierResolver::new(TieringMode::Route, RouteClassConfig::default())
    }

    fn tier_for(resolver: &TierResolver, method: Method, uri: &str) -> TierName {
        let request = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap();
        resolver.resolve(&GateRequest::from_request(&request))
    }

    #[test]
    fn test_tier_name_round_trip() {
        for tier in TierName::ALL {
            assert_eq!(tier.as_str().parse::<TierName>().unwrap(), tier);
        }
        assert!("platinum".parse::<TierName>().is_err());
    }

    #[test]
    fn test_route_tiers() {
        let resolver = route_resolver();
        assert_eq!(
            tier_for(&resolver, Method::POST, "/api/auth/login"),
            TierName::Auth
        );
        assert_eq!(
            tier_for(&resolver, Method::GET, "/api/v2/papers?page=2"),
            TierName::Search
        );
        assert_eq!(
            tier_for(&resolver, Method::POST, "/api/papers"),
            TierName::Write
        );
        assert_eq!(
            tier_for(&resolver, Method::DELETE, "/api/v1/experiments/3"),
            TierName::Write
        );
        assert_eq!(
            tier_for(&resolver, Method::GET, "/api/users/me"),
            TierName::Api
        );
    }

    #[test]
    fn test_prefix_is_segment_aware() {
        let resolver = route_resolver();
        assert_eq!(
            tier_for(&resolver, Method::GET, "/api/authors"),
            TierName::Api
        );
        assert!(has_prefix("/api/auth", "/api/auth/"));
        assert!(!has_prefix("/api/papersx", "/api/papers"));
    }

    #[test]
    fn test_exempt_paths() {
        let resolver = route_resolver();
        assert!(resolver.is_exempt("/api/health"));
        assert!(resolver.is_exempt("/api/v1/health"));
        assert!(resolver.is_exempt("/api/auth/session"));
        assert!(!resolver.is_exempt("/api/auth/login"));
        assert!(!resolver.is_exempt("/api/healthcheck"));
    }

    #[test]
    fn test_uncounted_paths() {
        let resolver = route_resolver();
        assert!(resolver.is_uncounted("/api/rate-limit/status"));
        assert!(resolver.is_uncounted("/api/v2/rate-limit/status"));
        assert!(!resolver.is_uncounted("/api/rate-limit"));
        assert!(!resolver.is_exempt("/api/rate-limit/status"));
    }

    #[test]
    fn test_credential_tiers() {
        let resolver = TierResolver::new(TieringMode::Credential, RouteClassConfig::default());
        let build = |pairs: &[(&str, &str)]| {
            let mut builder = http::Request::builder().uri("/api/papers");
            for (name, value) in pairs {
                builder = builder.header(*name, *value);
            }
            builder.body(()).unwrap()
        };

        let anonymous = build(&[]);
        let bearer = build(&[("authorization", "Bearer abc")]);
        let premium = build(&[("x-user-id", "1"), ("x-user-role", "Premium")]);
        let role_only = build(&[("x-user-role", "premium")]);

        assert_eq!(
            resolver.resolve(&GateRequest::from_request(&anonymous)),
            TierName::Anonymous
        );
        assert_eq!(
            resolver.resolve(&GateRequest::from_request(&bearer)),
            TierName::Authenticated
        );
        assert_eq!(
            resolver.resolve(&GateRequest::from_request(&premium)),
            TierName::Premium
        );
        assert_eq!(
            resolver.resolve(&GateRequest::from_request(&role_only)),
            TierName::Anonymous
        );
    }

    #[test]
    fn test_strip_version_segment() {
        assert_eq!(strip_version_segment("/api/v2/search"), "/api/search");
        assert_eq!(strip_version_segment("/api/v10"), "/api");
        assert_eq!(strip_version_segment("/api/videos"), "/api/videos");
        assert_eq!(strip_version_segment("/health"), "/health");
    }
}
