//! Session close reasons.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Why a session ended, or refused a packet.
///
/// Cloneable: a backend stores its close reason and also returns it from
/// every pending `run`.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("session replaced by a session for a new version")]
    ReplacedForNewVersion,

    #[error("session closed for a server-requested retry")]
    Retry,

    #[error("no version in common with the server")]
    InvalidVersion,

    #[error("received a public reset for packet {rejected_packet_number}")]
    PublicReset { rejected_packet_number: u64 },

    #[error("handshake did not complete in time")]
    HandshakeTimeout,

    #[error("transport error: {0}")]
    Io(Arc<io::Error>),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("failed to generate a connection ID")]
    ConnectionIdGeneration,

    #[error("session closed")]
    Closed,
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}
