//! Session backend seams for quicdial.
//!
//! The handshake and stream machinery of a connection lives behind the
//! [`SessionBackend`] trait; the dialer only routes packets to it, waits for
//! it and closes it. Backends are built by a [`SessionFactory`] so that the
//! legacy and TLS-based implementations, or mocks, can be swapped in.

use std::sync::Arc;

use async_trait::async_trait;
use quicdial_types::ConnectionId;

pub mod cid;
pub mod config;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod packet;
pub mod params;
pub mod transport;

pub use cid::{ConnectionIdGenerator, RandomConnectionIdGenerator};
pub use config::{SessionConfig, TransportParameters};
pub use error::SessionError;
pub use packet::ReceivedPacket;
pub use params::{BackendParams, LegacyParams, NegotiationHistory, SessionParams, TlsParams};
pub use transport::{Conn, Transport, UdpTransport};

/// A session state machine for one connection attempt.
///
/// Implementations own the cryptographic handshake and everything after it.
/// A backend is closed at most once; later calls to `close` are ignored.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    /// Hand over a validated packet addressed to this session.
    fn handle_packet(&self, packet: ReceivedPacket) -> Result<(), SessionError>;

    /// Drive the session until the handshake completes (`Ok`) or the session
    /// is closed first (`Err` carrying the close reason).
    async fn run(&self) -> Result<(), SessionError>;

    /// Close the session locally.
    fn close(&self, reason: SessionError);

    /// Close the session because the peer ended it.
    fn close_remote(&self, reason: SessionError);

    /// The connection ID this session was created with.
    fn connection_id(&self) -> &ConnectionId;
}

/// Builds session backends.
///
/// Creation must not start any I/O; the backend becomes active once `run`
/// is awaited.
pub trait SessionFactory: Send + Sync + 'static {
    fn create(&self, params: SessionParams) -> Result<Arc<dyn SessionBackend>, SessionError>;
}
