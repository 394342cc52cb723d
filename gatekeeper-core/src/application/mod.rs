//! Application Layer - the gatekeeping pipeline and response headers

pub mod headers;
pub mod pipeline;

pub use headers::HeaderComposer;
pub use pipeline::{ForwardContext, GateOutcome, GateResponse, Gatekeeper};
