//! Packets as handed to a session backend.

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use quicdial_wire::Header;

/// A datagram that passed validation.
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub remote_addr: SocketAddr,
    pub header: Header,
    /// Bytes following the header, already cut to the declared payload length.
    pub data: Bytes,
    pub rcv_time: Instant,
}
