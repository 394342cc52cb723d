//! Domain Layer - request gatekeeping rules
//!
//! Pure logic with no storage or framework dependencies beyond the `http`
//! types.

pub mod gatekeeper;

pub use gatekeeper::*;
