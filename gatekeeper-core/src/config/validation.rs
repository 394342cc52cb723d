//! Configuration validation module

use http::{HeaderName, HeaderValue};

use crate::config::{
    Config, LoggingConfig, RateLimitConfig, SecurityConfig, ServerConfig, StoreConfig,
    VersioningConfig,
};
use crate::domain::gatekeeper::{TierName, normalize_version};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },

    #[error("Store configuration error: {message}")]
    Store { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },

    #[error("Versioning configuration error: {message}")]
    Versioning { message: String },

    #[error("Security configuration error: {message}")]
    Security { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    pub fn versioning(message: impl Into<String>) -> Self {
        Self::Versioning {
            message: message.into(),
        }
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::Security {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        if self.host.is_empty() {
            return Err(ValidationError::server("Host cannot be empty"));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.level.trim().is_empty() {
            return Err(ValidationError::logging("Log level cannot be empty"));
        }

        match self.format.as_str() {
            "json" | "pretty" | "text" => Ok(()),
            other => Err(ValidationError::logging(format!(
                "Unknown log format '{}', expected one of: json, pretty, text",
                other
            ))),
        }
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_entries == 0 {
            return Err(ValidationError::store("max_entries must be greater than 0"));
        }

        if self.ttl_seconds == 0 {
            return Err(ValidationError::store("ttl_seconds must be greater than 0"));
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for tier in TierName::ALL {
            let quota = self.tiers.get(tier);
            if quota.max_requests == 0 {
                return Err(ValidationError::rate_limit(format!(
                    "Tier '{}' must allow at least one request",
                    tier
                )));
            }
            if quota.window_ms == 0 {
                return Err(ValidationError::rate_limit(format!(
                    "Tier '{}' window must be greater than 0",
                    tier
                )));
            }
            if quota.message.trim().is_empty() {
                return Err(ValidationError::rate_limit(format!(
                    "Tier '{}' message cannot be empty",
                    tier
                )));
            }
        }

        let routes = &self.routes;
        for prefix in routes
            .exempt
            .iter()
            .chain(routes.auth.iter())
            .chain(routes.search.iter())
        {
            if !prefix.starts_with('/') {
                return Err(ValidationError::rate_limit(format!(
                    "Route prefix '{}' must start with '/'",
                    prefix
                )));
            }
        }

        Ok(())
    }
}

impl Validate for VersioningConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.supported.is_empty() {
            return Err(ValidationError::versioning(
                "At least one supported version is required",
            ));
        }

        for version in self
            .supported
            .iter()
            .chain(self.deprecated.iter())
            .chain(self.handled.iter())
            .chain(std::iter::once(&self.default_version))
        {
            if normalize_version(version).as_deref() != Some(version.as_str()) {
                return Err(ValidationError::versioning(format!(
                    "Version '{}' must have the form v<number>",
                    version
                )));
            }
        }

        if !self.supported.contains(&self.default_version) {
            return Err(ValidationError::versioning(format!(
                "Default version '{}' is not in the supported set",
                self.default_version
            )));
        }

        if let Some(version) = self
            .deprecated
            .iter()
            .find(|v| !self.supported.contains(v))
        {
            return Err(ValidationError::versioning(format!(
                "Deprecated version '{}' is not in the supported set",
                version
            )));
        }

        if let Some(version) = self.handled.iter().find(|v| !self.supported.contains(v)) {
            return Err(ValidationError::versioning(format!(
                "Handled version '{}' is not in the supported set",
                version
            )));
        }

        if HeaderName::from_bytes(self.header.as_bytes()).is_err() {
            return Err(ValidationError::versioning(format!(
                "Invalid version header name '{}'",
                self.header
            )));
        }

        if self.query_param.is_empty() {
            return Err(ValidationError::versioning(
                "Version query parameter cannot be empty",
            ));
        }

        Ok(())
    }
}

impl Validate for SecurityConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("frame_options", &self.frame_options),
            ("xss_protection", &self.xss_protection),
            ("referrer_policy", &self.referrer_policy),
            ("permissions_policy", &self.permissions_policy),
        ] {
            if HeaderValue::from_str(value).is_err() {
                return Err(ValidationError::security(format!(
                    "{} is not a valid header value: '{}'",
                    name, value
                )));
            }
        }

        for origin in &self.allowed_origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ValidationError::security(format!(
                    "Invalid allowed origin '{}'",
                    origin
                )));
            }
        }

        if let Some(header) = self
            .allowed_headers
            .iter()
            .find(|h| HeaderName::from_bytes(h.as_bytes()).is_err())
        {
            return Err(ValidationError::security(format!(
                "Invalid allowed header '{}'",
                header
            )));
        }

        if let Some(method) = self
            .allowed_methods
            .iter()
            .find(|m| http::Method::from_bytes(m.as_bytes()).is_err())
        {
            return Err(ValidationError::security(format!(
                "Invalid allowed method '{}'",
                method
            )));
        }

        Ok(())
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.store.validate()?;
        self.rate_limit.validate()?;
        self.versioning.validate()?;
        self.security.validate()?;

        // A window longer than the entry lifetime would let counters expire mid-window.
        let ttl_ms = self.store.ttl_seconds.saturating_mul(1000);
        if let Some(tier) = TierName::ALL
            .into_iter()
            .find(|tier| self.rate_limit.tiers.get(*tier).window_ms > ttl_ms)
        {
            return Err(ValidationError::store(format!(
                "ttl_seconds ({}) is shorter than the '{}' tier window ({} ms)",
                self.store.ttl_seconds,
                tier,
                self.rate_limit.tiers.get(tier).window_ms
            )));
        }

        Ok(())
    }
}
