//! Client errors.

use std::net::SocketAddr;

use quicdial_session::SessionError;
use quicdial_types::{ConnectionId, VersionNumber};
use quicdial_wire::WireError;
use thiserror::Error;

/// Why a single datagram was dropped.
///
/// None of these end the connection; the read loop logs them and moves on.
#[derive(Debug, Clone, Error)]
pub enum PacketError {
    #[error("error parsing packet from {remote}: {source}")]
    MalformedHeader {
        remote: SocketAddr,
        source: WireError,
    },

    #[error("received packet with truncated connection ID, but didn't request truncation")]
    UnrequestedTruncation,

    #[error("received a packet with an unexpected connection ID ({received}, expected {expected})")]
    ConnectionIdMismatch {
        received: ConnectionId,
        expected: ConnectionId,
    },

    #[error("packet payload ({actual} bytes) is shorter than its declared length ({declared} bytes)")]
    TruncatedPacket { declared: u64, actual: usize },

    #[error("received a spoofed public reset from {from} (connection is with {expected})")]
    SpoofedReset {
        from: SocketAddr,
        expected: SocketAddr,
    },

    #[error("received a public reset, but an error occurred parsing it: {0}")]
    UnparseableReset(WireError),

    #[error("received a delayed version negotiation packet")]
    DelayedNegotiationPacket,

    #[error("session refused packet: {0}")]
    Session(SessionError),
}

/// Terminal errors of a dial attempt.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} is not a valid QUIC version")]
    InvalidVersion(VersionNumber),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}
