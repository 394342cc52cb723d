//! API models and DTOs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatekeeper_core::{ErrorBody, GatekeeperError, TierName};

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Seconds until the caller may retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,

    /// Versions the caller may use instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_versions: Option<Vec<String>>,

    /// Unique request identifier for tracking and support
    pub request_id: Uuid,

    /// Error occurrence timestamp
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            retry_after: None,
            supported_versions: None,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl From<ErrorBody> for ErrorResponse {
    fn from(body: ErrorBody) -> Self {
        Self {
            retry_after: body.retry_after,
            supported_versions: body.supported_versions,
            ..Self::new(body.error, body.message)
        }
    }
}

/// An error response paired with its status code
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorResponse) -> Self {
        Self { status, body }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorResponse::new("NOT_FOUND", message),
        )
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorResponse::new(code, message))
    }
}

impl From<GatekeeperError> for ApiError {
    fn from(err: GatekeeperError) -> Self {
        Self::new(err.status_code(), err.to_body().into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: String,

    /// Current service version
    pub version: String,

    /// Health check timestamp
    pub timestamp: DateTime<Utc>,
}

/// Caller's current quota usage, as reported by the status endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatusResponse {
    /// Identity key the quota is tracked under, e.g. `user:42`
    pub identity: String,
    pub tier: TierName,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: Option<DateTime<Utc>>,
    pub window_ms: u64,
    /// `fixed_window` or `sliding_window`
    pub strategy: String,
}

/// Payload of the version info endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfoResponse {
    /// Version that served this request
    pub version: String,
    /// Value the client sent, before normalization
    pub requested: String,
    /// Where the version came from: path, header, query or default
    pub source: String,
    pub deprecated: bool,
    /// IMF-fixdate after which a deprecated version may be removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<String>,
    pub default_version: String,
    pub supported_versions: Vec<String>,
    /// Routes available under this version
    pub endpoints: Vec<String>,
}
