//! Gatekeeping domain: who is calling, which quota applies, which API
//! version is requested, and how refusals are described.

pub mod errors;
pub mod identity;
pub mod request;
pub mod tier;
pub mod version;

pub use errors::{ErrorBody, GatekeeperError, LookupStage};
pub use identity::ClientIdentity;
pub use request::GateRequest;
pub use tier::{TierName, TierResolver, UnknownTierError, strip_version_segment};
pub use version::{
    VersionContext, VersionNegotiator, VersionRegistry, VersionSource, is_version_token,
    normalize_version, path_version,
};
