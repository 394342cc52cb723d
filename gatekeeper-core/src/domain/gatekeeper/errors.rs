//! Gatekeeping error taxonomy and its wire representation

use http::StatusCode;
use serde::{Deserialize, Serialize};

use super::tier::TierName;

/// Pipeline stage an internal lookup failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    RateLimit,
    Version,
}

impl LookupStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStage::RateLimit => "rate limit",
            LookupStage::Version => "version",
        }
    }
}

impl std::fmt::Display for LookupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasons the gatekeeper refuses a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatekeeperError {
    #[error("{message}")]
    RateLimitExceeded {
        tier: TierName,
        limit: u32,
        reset_at_ms: u64,
        retry_after_secs: u64,
        message: String,
    },

    #[error(
        "API version '{requested}' is not supported. Supported versions: {}",
        .supported.join(", ")
    )]
    UnsupportedVersion {
        requested: String,
        supported: Vec<String>,
    },

    #[error("No handler is registered for API version '{version}'")]
    VersionHandlerMissing { version: String },

    /// Non-terminal for rate limiting, terminal for version parsing
    #[error("{stage} lookup failed: {reason}")]
    InternalLookupFailure {
        stage: LookupStage,
        reason: String,
        supported: Vec<String>,
    },
}

impl GatekeeperError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            GatekeeperError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            GatekeeperError::UnsupportedVersion { .. } => "UNSUPPORTED_API_VERSION",
            GatekeeperError::VersionHandlerMissing { .. } => "VERSION_HANDLER_MISSING",
            GatekeeperError::InternalLookupFailure {
                stage: LookupStage::Version,
                ..
            } => "INVALID_API_VERSION",
            GatekeeperError::InternalLookupFailure {
                stage: LookupStage::RateLimit,
                ..
            } => "RATE_LIMIT_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatekeeperError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatekeeperError::UnsupportedVersion { .. } => StatusCode::BAD_REQUEST,
            GatekeeperError::VersionHandlerMissing { .. } => StatusCode::NOT_IMPLEMENTED,
            GatekeeperError::InternalLookupFailure { stage, .. } => match stage {
                LookupStage::Version => StatusCode::BAD_REQUEST,
                LookupStage::RateLimit => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Whether the pipeline stops at this error. Rate limit lookups fail open.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            GatekeeperError::InternalLookupFailure {
                stage: LookupStage::RateLimit,
                ..
            }
        )
    }

    /// JSON body carrying the remediation hint for this error
    pub fn to_body(&self) -> ErrorBody {
        match self {
            GatekeeperError::RateLimitExceeded {
                retry_after_secs,
                message,
                ..
            } => ErrorBody {
                error: self.code().to_string(),
                message: message.clone(),
                retry_after: Some(*retry_after_secs),
                supported_versions: None,
            },
            GatekeeperError::UnsupportedVersion { supported, .. } => ErrorBody {
                error: self.code().to_string(),
                message: self.to_string(),
                retry_after: None,
                supported_versions: Some(supported.clone()),
            },
            GatekeeperError::InternalLookupFailure {
                stage: LookupStage::Version,
                reason,
                supported,
            } => ErrorBody {
                error: self.code().to_string(),
                message: format!(
                    "Invalid API version: {}. Supported versions: {}",
                    reason,
                    supported.join(", ")
                ),
                retry_after: None,
                supported_versions: Some(supported.clone()),
            },
            GatekeeperError::VersionHandlerMissing { .. }
            | GatekeeperError::InternalLookupFailure { .. } => ErrorBody {
                error: self.code().to_string(),
                message: self.to_string(),
                retry_after: None,
                supported_versions: None,
            },
        }
    }
}

/// Structured error body returned at the pipeline boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_versions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_body() {
        let err = GatekeeperError::RateLimitExceeded {
            tier: TierName::Auth,
            limit: 5,
            reset_at_ms: 10_000,
            retry_after_secs: 7,
            message: "Too many authentication attempts".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        let json = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(json["error"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(json["retryAfter"], 7);
        assert!(json.get("supportedVersions").is_none());
    }

    #[test]
    fn test_unsupported_version_lists_supported() {
        let err = GatekeeperError::UnsupportedVersion {
            requested: "v9".to_string(),
            supported: vec!["v1".to_string(), "v2".to_string()],
        };
        let body = err.to_body();
        assert_eq!(body.supported_versions.as_deref().unwrap().len(), 2);
        assert!(body.message.contains("v1, v2"));
    }

    #[test]
    fn test_rate_limit_lookup_failure_is_not_terminal() {
        let err = GatekeeperError::InternalLookupFailure {
            stage: LookupStage::RateLimit,
            reason: "store unavailable".to_string(),
            supported: Vec::new(),
        };
        assert!(!err.is_terminal());

        let err = GatekeeperError::InternalLookupFailure {
            stage: LookupStage::Version,
            reason: "bad".to_string(),
            supported: vec!["v1".to_string()],
        };
        assert!(err.is_terminal());
        assert_eq!(err.code(), "INVALID_API_VERSION");
    }

    #[test]
    fn test_handler_missing_is_501() {
        let err = GatekeeperError::VersionHandlerMissing {
            version: "v2".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert!(err.to_body().message.contains("v2"));
    }
}
