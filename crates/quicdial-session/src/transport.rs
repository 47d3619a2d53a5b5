//! Datagram transport beneath a connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::debug;

/// An unreliable datagram socket.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Receive one datagram into `buf`.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send one datagram to `target`.
    async fn send_to(&self, data: &[u8], target: SocketAddr) -> io::Result<usize>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Stop the transport. Pending and later receives fail.
    fn close(&self);
}

fn aborted() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "transport closed")
}

/// [`Transport`] over a tokio UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
    closed: watch::Sender<bool>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    #[must_use]
    pub fn from_socket(socket: UdpSocket) -> Self {
        let (closed, _) = watch::channel(false);
        Self { socket, closed }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(aborted());
        }
        tokio::select! {
            result = self.socket.recv_from(buf) => result,
            _ = closed.wait_for(|closed| *closed) => Err(aborted()),
        }
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> io::Result<usize> {
        if *self.closed.borrow() {
            return Err(aborted());
        }
        self.socket.send_to(data, target).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn close(&self) {
        if !self.closed.send_replace(true) {
            debug!("UDP transport closed");
        }
    }
}

/// Write side of a connection: a transport plus the peer's address.
#[derive(Clone)]
pub struct Conn {
    transport: Arc<dyn Transport>,
    remote_addr: SocketAddr,
}

impl Conn {
    pub fn new(transport: Arc<dyn Transport>, remote_addr: SocketAddr) -> Self {
        Self {
            transport,
            remote_addr,
        }
    }

    /// Send `data` to the peer.
    pub async fn write(&self, data: &[u8]) -> io::Result<usize> {
        self.transport.send_to(data, self.remote_addr).await
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.transport.local_addr().ok())
            .finish()
    }
}
