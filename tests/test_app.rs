//! Smoke tests for application wiring

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use api_gatekeeper::{Config, create_app};

#[tokio::test]
async fn test_default_config_serves_health() {
    let app = create_app(&Config::default()).unwrap();
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_default_config_applies_rate_limit_headers() {
    let app = create_app(&Config::default()).unwrap();
    let response = app
        .oneshot(
            Request::get("/api/v1/version")
                .header("x-forwarded-for", "198.51.100.20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "100");
    assert_eq!(response.headers()["x-api-version"], "v1");
}

#[test]
fn test_invalid_version_header_name_is_rejected() {
    let mut config = Config::default();
    config.versioning.header = "bad header".to_string();
    assert!(create_app(&config).is_err());
}
