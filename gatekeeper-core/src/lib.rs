//! Gatekeeper Core - framework-agnostic API gatekeeping
//!
//! Everything that decides whether a request may reach an API handler:
//!
//! # Modules
//!
//! - [`config`] - Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] - Client identity, quota tiers, API versions and the error taxonomy
//! - [`application`] - The ordered gatekeeping pipeline and response header composition
//! - [`infrastructure`] - Clock, bounded counter store and rate limiting strategies
//! - [`logging`] - Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! gatekeeper-core/
//! ├── domain/           # Identity, tiers, versions, errors
//! ├── application/      # Pipeline and header composer
//! ├── infrastructure/
//! │   ├── clock.rs      # Injectable time source
//! │   └── rate_limiter/ # Store, fixed/sliding window, service
//! └── config/           # Configuration management
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use gatekeeper_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `GATEKEEPER__` prefix with double underscore separators:
//!
//! ```bash
//! GATEKEEPER__SERVER__PORT=8080
//! GATEKEEPER__RATE_LIMIT__STRATEGY=fixed_window
//! GATEKEEPER__RATE_LIMIT__TIERS__AUTH__MAX_REQUESTS=10
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gatekeeper_core::{Config, Gatekeeper, GateOutcome, GateRequest, SystemClock};
//!
//! let gatekeeper = Gatekeeper::from_config(&config, Arc::new(SystemClock))?;
//! match gatekeeper.evaluate(&GateRequest::from_request(&request)) {
//!     GateOutcome::Respond(response) => { /* answer without calling the handler */ }
//!     GateOutcome::Forward(ctx) => { /* call the handler, then merge ctx.headers */ }
//! }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::{ForwardContext, GateOutcome, GateResponse, Gatekeeper, HeaderComposer};
pub use config::Config;
pub use domain::gatekeeper::{
    ClientIdentity, ErrorBody, GateRequest, GatekeeperError, TierName, VersionContext,
    VersionRegistry,
};
pub use infrastructure::clock::{Clock, ManualClock, SystemClock};
pub use infrastructure::rate_limiter::RateLimiterService;
pub use logging::init_tracing;
