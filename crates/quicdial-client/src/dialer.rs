//! Dialing: from an address or a transport to an established session.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use quicdial_session::{
    Conn, ConnectionIdGenerator, RandomConnectionIdGenerator, SessionBackend, SessionError,
    SessionFactory, Transport, UdpTransport,
};
use quicdial_types::{ConnectionId, SupportedVersions, VersionNumber};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::connection::{ClientConnection, ConnectionParts};
use crate::error::ClientError;

/// Builds client connections with a given session factory.
pub struct Dialer {
    factory: Arc<dyn SessionFactory>,
    supported: SupportedVersions,
    connection_ids: Arc<dyn ConnectionIdGenerator>,
}

impl Dialer {
    /// A dialer speaking the default supported versions, with random
    /// connection IDs.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            supported: SupportedVersions::default(),
            connection_ids: Arc::new(RandomConnectionIdGenerator::new()),
        }
    }

    #[must_use]
    pub fn with_supported_versions(mut self, supported: SupportedVersions) -> Self {
        self.supported = supported;
        self
    }

    #[must_use]
    pub fn with_connection_id_generator(
        mut self,
        connection_ids: Arc<dyn ConnectionIdGenerator>,
    ) -> Self {
        self.connection_ids = connection_ids;
        self
    }

    #[must_use]
    pub fn supported_versions(&self) -> &SupportedVersions {
        &self.supported
    }

    /// Resolve `addr` ("host:port"), bind a UDP socket and dial.
    pub async fn dial_addr(
        &self,
        addr: &str,
        tls: Option<Arc<rustls::ClientConfig>>,
        config: &ClientConfig,
    ) -> Result<SessionHandle, ClientError> {
        let remote = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))?;
        let bind: SocketAddr = if remote.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let transport = UdpTransport::bind(bind).await?;
        debug!(local = %transport.local_addr()?, remote = %remote, "bound UDP socket");
        self.dial(Arc::new(transport), remote, addr, tls, config)
            .await
    }

    /// Dial `remote` over `transport`. `host` is the address as the caller
    /// wrote it; its host part names the server unless the config overrides
    /// it.
    pub async fn dial(
        &self,
        transport: Arc<dyn Transport>,
        remote: SocketAddr,
        host: &str,
        tls: Option<Arc<rustls::ClientConfig>>,
        config: &ClientConfig,
    ) -> Result<SessionHandle, ClientError> {
        let connection = self.connect(transport, remote, host, tls, config)?;
        connection.dial().await
    }

    /// Build the connection and its first session without starting it.
    pub fn connect(
        &self,
        transport: Arc<dyn Transport>,
        remote: SocketAddr,
        host: &str,
        tls: Option<Arc<rustls::ClientConfig>>,
        config: &ClientConfig,
    ) -> Result<ClientConnection, ClientError> {
        let session_config = config.populate(&self.supported)?;
        let hostname = match &config.server_name {
            Some(name) => name.clone(),
            None => host_part(host)?,
        };
        ClientConnection::new(ConnectionParts {
            conn: Conn::new(transport, remote),
            hostname,
            config: Arc::new(session_config),
            tls,
            supported: self.supported.clone(),
            factory: Arc::clone(&self.factory),
            connection_ids: Arc::clone(&self.connection_ids),
        })
    }
}

/// The host of a "host:port" address, without IPv6 brackets.
fn host_part(addr: &str) -> Result<String, ClientError> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))?;
    if port.parse::<u16>().is_err() {
        return Err(ClientError::InvalidAddress(addr.to_string()));
    }
    let host = match host.strip_prefix('[') {
        Some(bracketed) => bracketed
            .strip_suffix(']')
            .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))?,
        None if host.contains(':') => return Err(ClientError::InvalidAddress(addr.to_string())),
        None => host,
    };
    Ok(host.to_string())
}

/// An established connection.
///
/// Owns the read loop; dropping the handle stops it and closes the
/// transport.
pub struct SessionHandle {
    connection: ClientConnection,
    read_loop: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) fn new(connection: ClientConnection, read_loop: JoinHandle<()>) -> Self {
        Self {
            connection,
            read_loop,
        }
    }

    /// The active session backend.
    #[must_use]
    pub fn session(&self) -> Arc<dyn SessionBackend> {
        self.connection.session()
    }

    #[must_use]
    pub fn connection(&self) -> &ClientConnection {
        &self.connection
    }

    #[must_use]
    pub fn version(&self) -> VersionNumber {
        self.connection.version()
    }

    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.src_connection_id()
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_addr()
    }

    /// Close the session and stop the read loop.
    pub fn close(self) {
        info!(remote = %self.remote_addr(), "closing connection");
        self.connection.close(SessionError::Closed);
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("remote_addr", &self.remote_addr())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.read_loop.abort();
        self.connection.close_transport();
    }
}
