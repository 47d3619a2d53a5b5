//! Per-datagram checks run before anything reaches a session.

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use quicdial_session::ReceivedPacket;
use quicdial_types::{ConnectionId, Perspective, VersionNumber};
use quicdial_wire::{Header, PublicReset, VersionNegotiationHeader};

use crate::error::PacketError;
use crate::reset;

/// The connection state a datagram is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The address the connection talks to.
    pub remote_addr: SocketAddr,
    /// The version currently spoken; decides how short headers are read.
    pub version: VersionNumber,
    /// Incoming packets must be addressed to this ID.
    pub src_connection_id: &'a ConnectionId,
    /// Whether the client asked the server to leave out connection IDs.
    pub omission_requested: bool,
}

/// A datagram that passed validation, sorted by what must happen next.
#[derive(Debug)]
pub enum Validated {
    /// Ordinary traffic for the active session.
    Packet(ReceivedPacket),
    /// A list of versions the server offers instead.
    VersionNegotiation(VersionNegotiationHeader),
    /// An authenticated public reset.
    Reset(PublicReset),
}

/// Check one datagram received `from`.
pub fn validate(
    ctx: &ValidationContext<'_>,
    from: SocketAddr,
    data: Bytes,
    rcv_time: Instant,
) -> Result<Validated, PacketError> {
    let (header, header_len) = Header::parse(&data, Perspective::Server, ctx.version)
        .map_err(|source| PacketError::MalformedHeader {
            remote: from,
            source,
        })?;

    if header.omits_connection_id() && !ctx.omission_requested {
        return Err(PacketError::UnrequestedTruncation);
    }
    if let Some(received) = header.destination_connection_id() {
        if received != ctx.src_connection_id {
            return Err(PacketError::ConnectionIdMismatch {
                received: received.clone(),
                expected: ctx.src_connection_id.clone(),
            });
        }
    }

    let payload = data.slice(header_len..);
    match header {
        Header::PublicReset(_) => {
            reset::authenticate(ctx.remote_addr, from, &payload).map(Validated::Reset)
        }
        Header::VersionNegotiation(offer) => Ok(Validated::VersionNegotiation(offer)),
        header => {
            let data = match header.payload_len() {
                Some(declared) => {
                    let len = usize::try_from(declared).unwrap_or(usize::MAX);
                    if payload.len() < len {
                        return Err(PacketError::TruncatedPacket {
                            declared,
                            actual: payload.len(),
                        });
                    }
                    payload.slice(..len)
                }
                None => payload,
            };
            Ok(Validated::Packet(ReceivedPacket {
                remote_addr: from,
                header,
                data,
                rcv_time,
            }))
        }
    }
}
