//! Configuration management

pub mod validation;

pub use validation::{Validate, ValidationError};

use serde::{Deserialize, Serialize};

use crate::domain::gatekeeper::TierName;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub rate_limit: RateLimitConfig,
    pub versioning: VersioningConfig,
    pub security: SecurityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace period for in-flight requests after a shutdown signal (in seconds)
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout_seconds: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// One of `json`, `pretty` or `text`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Bounded counter store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of tracked keys before LRU eviction kicks in
    pub max_entries: usize,
    /// Lifetime of an entry after its last write (in seconds)
    pub ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_seconds: 900,
        }
    }
}

/// Rate limiting algorithm used by a limiter instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategyKind {
    /// Counter reset wholesale at the end of each window
    FixedWindow,
    /// Exact log of request timestamps within a trailing window
    #[default]
    SlidingWindow,
}

impl RateLimitStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitStrategyKind::FixedWindow => "fixed_window",
            RateLimitStrategyKind::SlidingWindow => "sliding_window",
        }
    }
}

impl std::fmt::Display for RateLimitStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a request is mapped to a quota tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieringMode {
    /// anonymous / authenticated / premium, from credential hints
    Credential,
    /// api / auth / search / write, from path and method
    #[default]
    Route,
}

/// Where a fixed window starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// The window opens at the first request of the key
    #[default]
    Rolling,
    /// Windows are aligned to multiples of the window length since the epoch
    Aligned,
}

/// A named quota: at most `max_requests` per `window_ms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTier {
    pub window_ms: u64,
    pub max_requests: u32,
    /// Human message returned with 429 responses
    pub message: String,
}

impl QuotaTier {
    pub fn new(window_ms: u64, max_requests: u32, message: impl Into<String>) -> Self {
        Self {
            window_ms,
            max_requests,
            message: message.into(),
        }
    }
}

const FIFTEEN_MINUTES_MS: u64 = 15 * 60 * 1000;
const ONE_MINUTE_MS: u64 = 60 * 1000;

/// Quota table, one entry per tier.
///
/// Unknown keys are rejected when loading, so a typo in a tier name is a
/// configuration error rather than a silently ignored section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierLimitsConfig {
    pub anonymous: QuotaTier,
    pub authenticated: QuotaTier,
    pub premium: QuotaTier,
    pub api: QuotaTier,
    pub auth: QuotaTier,
    pub search: QuotaTier,
    pub write: QuotaTier,
}

impl TierLimitsConfig {
    pub fn get(&self, tier: TierName) -> &QuotaTier {
        match tier {
            TierName::Anonymous => &self.anonymous,
            TierName::Authenticated => &self.authenticated,
            TierName::Premium => &self.premium,
            TierName::Api => &self.api,
            TierName::Auth => &self.auth,
            TierName::Search => &self.search,
            TierName::Write => &self.write,
        }
    }

    pub fn get_mut(&mut self, tier: TierName) -> &mut QuotaTier {
        match tier {
            TierName::Anonymous => &mut self.anonymous,
            TierName::Authenticated => &mut self.authenticated,
            TierName::Premium => &mut self.premium,
            TierName::Api => &mut self.api,
            TierName::Auth => &mut self.auth,
            TierName::Search => &mut self.search,
            TierName::Write => &mut self.write,
        }
    }
}

impl Default for TierLimitsConfig {
    fn default() -> Self {
        Self {
            anonymous: QuotaTier::new(
                FIFTEEN_MINUTES_MS,
                100,
                "Too many requests from this client, please try again later.",
            ),
            authenticated: QuotaTier::new(
                FIFTEEN_MINUTES_MS,
                1000,
                "Rate limit exceeded for authenticated user.",
            ),
            premium: QuotaTier::new(
                FIFTEEN_MINUTES_MS,
                5000,
                "Rate limit exceeded for premium user.",
            ),
            api: QuotaTier::new(
                FIFTEEN_MINUTES_MS,
                100,
                "Too many API requests, please try again later.",
            ),
            auth: QuotaTier::new(
                FIFTEEN_MINUTES_MS,
                5,
                "Too many authentication attempts, please try again later.",
            ),
            search: QuotaTier::new(
                ONE_MINUTE_MS,
                30,
                "Too many search requests, please slow down.",
            ),
            write: QuotaTier::new(
                ONE_MINUTE_MS,
                20,
                "Too many write operations, please slow down.",
            ),
        }
    }
}

/// Path prefixes used by route-based tiering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteClassConfig {
    /// Never rate limited, never version checked
    pub exempt: Vec<String>,
    /// Strict `auth` tier
    pub auth: Vec<String>,
    /// `search` tier for reads
    pub search: Vec<String>,
    /// Version checked but never counted against a quota
    pub uncounted: Vec<String>,
}

impl Default for RouteClassConfig {
    fn default() -> Self {
        Self {
            exempt: vec![
                "/api/health".to_string(),
                "/health".to_string(),
                "/api/auth/session".to_string(),
                "/api/auth/csrf".to_string(),
                "/api/auth/providers".to_string(),
            ],
            auth: vec!["/api/auth".to_string()],
            search: vec![
                "/api/search".to_string(),
                "/api/papers".to_string(),
                "/api/experiments".to_string(),
                "/api/predictions".to_string(),
            ],
            uncounted: vec!["/api/rate-limit/status".to_string()],
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Exactly one algorithm per limiter instance
    pub strategy: RateLimitStrategyKind,
    pub tiering: TieringMode,
    pub fixed_window_alignment: WindowAlignment,
    pub tiers: TierLimitsConfig,
    pub routes: RouteClassConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: RateLimitStrategyKind::default(),
            tiering: TieringMode::default(),
            fixed_window_alignment: WindowAlignment::default(),
            tiers: TierLimitsConfig::default(),
            routes: RouteClassConfig::default(),
        }
    }
}

/// API version negotiation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    pub supported: Vec<String>,
    /// Still served, but answered with deprecation and sunset headers
    pub deprecated: Vec<String>,
    pub default_version: String,
    pub header: String,
    pub query_param: String,
    pub sunset_days: u32,
    /// Versions the built-in version info endpoint has handlers for
    pub handled: Vec<String>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            supported: vec!["v1".to_string(), "v2".to_string()],
            deprecated: Vec::new(),
            default_version: "v1".to_string(),
            header: "x-api-version".to_string(),
            query_param: "version".to_string(),
            sunset_days: 90,
            handled: vec!["v1".to_string(), "v2".to_string()],
        }
    }
}

/// CORS and hardening header configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enabled: bool,
    /// Allowed CORS origins. Use ["*"] to allow any.
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_seconds: u64,
    pub frame_options: String,
    pub xss_protection: String,
    pub referrer_policy: String,
    pub permissions_policy: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: [
                "content-type",
                "authorization",
                "x-api-key",
                "x-api-version",
                "x-user-id",
                "x-requested-with",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            max_age_seconds: 86_400,
            frame_options: "DENY".to_string(),
            xss_protection: "1; mode=block".to_string(),
            referrer_policy: "strict-origin-when-cross-origin".to_string(),
            permissions_policy: "camera=(), microphone=(), geolocation=()".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Sources, lowest priority first: `config/default`, `config/{ENV}`,
    /// `config/local`, then `GATEKEEPER__*` environment variables.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("GATEKEEPER")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rate_limit.routes.exempt")
                    .with_list_parse_key("rate_limit.routes.auth")
                    .with_list_parse_key("rate_limit.routes.search")
                    .with_list_parse_key("rate_limit.routes.uncounted")
                    .with_list_parse_key("versioning.supported")
                    .with_list_parse_key("versioning.deprecated")
                    .with_list_parse_key("versioning.handled")
                    .with_list_parse_key("security.allowed_origins")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}
