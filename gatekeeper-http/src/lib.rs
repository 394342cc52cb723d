//! Gatekeeper HTTP - axum adapter for the API gatekeeper
//!
//! Drives [`gatekeeper_core::Gatekeeper`] from an axum middleware and serves
//! the gatekeeper's own endpoints.
//!
//! # API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/health` | GET | Health check, exempt from rate limiting |
//! | `/api/rate-limit/status` | GET | Caller's current quota usage (`?tier=` to pick a tier) |
//! | `/api/version` | GET | Negotiated API version info |
//! | `/api/{version}/version` | GET | Same, with the version in the path |
//!
//! Handlers behind the middleware can read the caller's
//! [`ClientIdentity`](gatekeeper_core::ClientIdentity),
//! [`TierName`](gatekeeper_core::TierName) and
//! [`VersionContext`](gatekeeper_core::VersionContext) from request extensions.

pub mod presentation;

pub use presentation::{AppState, create_router};
