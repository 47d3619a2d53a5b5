//! Packet header codec for quicdial.
//!
//! Parses and serializes the headers of both protocol generations: the
//! legacy public header, and the long/short headers of the TLS-based
//! generation. Also composes version negotiation packets and encodes/decodes
//! public-reset records. Payloads are never interpreted here.

pub mod error;
pub mod header;
pub mod negotiation;
pub mod reset;
pub mod varint;

pub use error::WireError;
pub use header::{
    Header, HeaderForm, LongHeader, LongPacketType, PacketNumberLen, PublicHeader,
    PublicResetHeader, ShortHeader, VersionNegotiationHeader, LEGACY_CONNECTION_ID_LEN,
    SHORT_HEADER_CONNECTION_ID_LEN,
};
pub use negotiation::{compose_legacy_version_negotiation, compose_version_negotiation};
pub use reset::{PublicReset, PUBLIC_RESET_TAG};
