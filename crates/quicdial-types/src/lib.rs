//! Shared types for quicdial.
//!
//! This crate contains the identifiers every other quicdial crate speaks in:
//! connection IDs, protocol version numbers, the supported-version list used
//! during negotiation, and the endpoint perspective.

pub mod connection_id;
pub mod perspective;
pub mod version;

pub use connection_id::{ConnectionId, MAX_CONNECTION_ID_LEN};
pub use perspective::Perspective;
pub use version::{
    choose_supported_version, ParseVersionError, Scheme, SupportedVersions, VersionNumber,
    DEFAULT_SUPPORTED_VERSIONS,
};
