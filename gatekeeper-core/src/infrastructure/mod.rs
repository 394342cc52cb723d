//! Infrastructure: time source and rate limit bookkeeping

pub mod clock;
pub mod rate_limiter;

pub use clock::{Clock, ManualClock, SystemClock};
