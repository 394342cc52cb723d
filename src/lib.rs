//! API Gatekeeper - main application library
//!
//! Wires the gatekeeping core into the HTTP layer

mod app;

pub use app::{AppError, create_app};
pub use gatekeeper_core::{Config, init_tracing};

pub use gatekeeper_core;
pub use gatekeeper_http;
