//! Parameters a session backend is created with.

use std::sync::Arc;

use quicdial_types::{ConnectionId, Scheme, VersionNumber};
use tokio::sync::watch;

use crate::config::{SessionConfig, TransportParameters};
use crate::transport::Conn;

/// Versions seen during negotiation, kept so the handshake can prove to the
/// server that no downgrade happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationHistory {
    /// The version the client first offered.
    pub initial_version: VersionNumber,
    /// The versions the server listed in its negotiation packet.
    pub negotiated_versions: Vec<VersionNumber>,
}

/// Everything a factory needs to build one session.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub conn: Conn,
    /// Server name for certificate verification.
    pub hostname: String,
    pub version: VersionNumber,
    pub src_connection_id: ConnectionId,
    pub dest_connection_id: ConnectionId,
    pub config: Arc<SessionConfig>,
    pub tls: Option<Arc<rustls::ClientConfig>>,
    pub backend: BackendParams,
}

impl SessionParams {
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        match self.backend {
            BackendParams::Legacy(_) => Scheme::Legacy,
            BackendParams::Tls(_) => Scheme::Tls,
        }
    }
}

/// Parameters specific to one protocol generation.
#[derive(Debug, Clone)]
pub enum BackendParams {
    Legacy(LegacyParams),
    Tls(TlsParams),
}

#[derive(Debug, Clone)]
pub struct LegacyParams {
    /// The version the client started the connection with.
    pub initial_version: VersionNumber,
    /// `None` until a version negotiation packet was honored.
    pub history: Option<NegotiationHistory>,
}

#[derive(Debug, Clone)]
pub struct TlsParams {
    /// The version the client started the connection with.
    pub initial_version: VersionNumber,
    /// `None` until a version negotiation packet was honored.
    pub history: Option<NegotiationHistory>,
    pub transport_parameters: TransportParameters,
    /// Filled in by the backend once the peer's parameters are known. The
    /// same channel is handed to every session of a connection, so the
    /// value survives a retry.
    pub peer_parameters: Arc<watch::Sender<Option<TransportParameters>>>,
    pub initial_packet_number: u64,
}
