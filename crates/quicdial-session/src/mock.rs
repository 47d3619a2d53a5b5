//! Mock transport, session and factory for testing.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quicdial_types::ConnectionId;
use tokio::sync::{mpsc, watch};

use crate::error::SessionError;
use crate::packet::ReceivedPacket;
use crate::params::SessionParams;
use crate::transport::Transport;
use crate::{ConnectionIdGenerator, SessionBackend, SessionFactory};

fn aborted() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "mock transport closed")
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

type Datagram = io::Result<(Vec<u8>, SocketAddr)>;

/// A datagram written through a [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub data: Vec<u8>,
    pub target: SocketAddr,
}

/// In-memory transport. Tests feed it datagrams through a
/// [`MockTransportHandle`].
pub struct MockTransport {
    local_addr: SocketAddr,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
    sent: Arc<Mutex<Vec<SentDatagram>>>,
    closed: Arc<watch::Sender<bool>>,
}

impl MockTransport {
    /// Create a transport bound to `local_addr` and the handle driving it.
    pub fn new(local_addr: SocketAddr) -> (Self, MockTransportHandle) {
        let (feed, incoming) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let transport = Self {
            local_addr,
            incoming: tokio::sync::Mutex::new(incoming),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(closed),
        };
        let handle = MockTransportHandle {
            feed,
            sent: Arc::clone(&transport.sent),
            closed: Arc::clone(&transport.closed),
        };
        (transport, handle)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(aborted());
        }
        let mut incoming = self.incoming.lock().await;
        tokio::select! {
            datagram = incoming.recv() => match datagram {
                Some(Ok((data, from))) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok((n, from))
                }
                Some(Err(e)) => Err(e),
                None => Err(aborted()),
            },
            _ = closed.wait_for(|closed| *closed) => Err(aborted()),
        }
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> io::Result<usize> {
        if *self.closed.borrow() {
            return Err(aborted());
        }
        self.sent.lock().unwrap().push(SentDatagram {
            data: data.to_vec(),
            target,
        });
        Ok(data.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// Clonable handle feeding and observing a [`MockTransport`].
#[derive(Clone)]
pub struct MockTransportHandle {
    feed: mpsc::UnboundedSender<Datagram>,
    sent: Arc<Mutex<Vec<SentDatagram>>>,
    closed: Arc<watch::Sender<bool>>,
}

impl MockTransportHandle {
    /// Make `data` arrive as if sent from `from`.
    pub fn deliver(&self, data: impl Into<Vec<u8>>, from: SocketAddr) {
        let _ = self.feed.send(Ok((data.into(), from)));
    }

    /// Make the next receive fail.
    pub fn fail_read(&self, error: io::Error) {
        let _ = self.feed.send(Err(error));
    }

    /// Snapshot of everything written so far.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockSessionState {
    handled: Vec<ReceivedPacket>,
    close_reason: Option<SessionError>,
    closed_remotely: bool,
    reject_with: Option<SessionError>,
}

type Outcome = Option<Result<(), SessionError>>;

/// Session backend whose handshake is completed or failed by the test.
pub struct MockSession {
    connection_id: ConnectionId,
    state: Arc<Mutex<MockSessionState>>,
    outcome: Arc<watch::Sender<Outcome>>,
}

impl MockSession {
    pub fn new(connection_id: ConnectionId) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            connection_id,
            state: Arc::new(Mutex::new(MockSessionState::default())),
            outcome: Arc::new(outcome),
        }
    }

    /// Get a clonable handle for driving and observing this session.
    pub fn handle(&self) -> MockSessionHandle {
        MockSessionHandle {
            connection_id: self.connection_id.clone(),
            state: Arc::clone(&self.state),
            outcome: Arc::clone(&self.outcome),
        }
    }

    fn finish(&self, reason: SessionError, remote: bool) {
        {
            let mut state = self.state.lock().unwrap();
            if state.close_reason.is_some() {
                return;
            }
            state.close_reason = Some(reason.clone());
            state.closed_remotely = remote;
        }
        settle(&self.outcome, Err(reason));
    }
}

fn settle(outcome: &watch::Sender<Outcome>, result: Result<(), SessionError>) {
    outcome.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(result);
        true
    });
}

#[async_trait]
impl SessionBackend for MockSession {
    fn handle_packet(&self, packet: ReceivedPacket) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = &state.reject_with {
            return Err(e.clone());
        }
        state.handled.push(packet);
        Ok(())
    }

    async fn run(&self) -> Result<(), SessionError> {
        let mut outcome = self.outcome.subscribe();
        let result = match outcome.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone(),
            Err(_) => None,
        };
        result.unwrap_or(Err(SessionError::Closed))
    }

    fn close(&self, reason: SessionError) {
        self.finish(reason, false);
    }

    fn close_remote(&self, reason: SessionError) {
        self.finish(reason, true);
    }

    fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
}

/// Clonable handle for a [`MockSession`].
#[derive(Clone)]
pub struct MockSessionHandle {
    connection_id: ConnectionId,
    state: Arc<Mutex<MockSessionState>>,
    outcome: Arc<watch::Sender<Outcome>>,
}

impl MockSessionHandle {
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Packets the session accepted, in order.
    pub fn handled_packets(&self) -> Vec<ReceivedPacket> {
        self.state.lock().unwrap().handled.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().close_reason.is_some()
    }

    /// The reason passed to the first `close`/`close_remote`.
    pub fn close_reason(&self) -> Option<SessionError> {
        self.state.lock().unwrap().close_reason.clone()
    }

    /// Whether the session was closed by `close_remote`.
    pub fn closed_remotely(&self) -> bool {
        self.state.lock().unwrap().closed_remotely
    }

    /// Let `run` return `Ok`.
    pub fn complete_handshake(&self) {
        settle(&self.outcome, Ok(()));
    }

    /// Let `run` return `Err(error)` without closing the session.
    pub fn fail_handshake(&self, error: SessionError) {
        settle(&self.outcome, Err(error));
    }

    /// Refuse every following packet with `error`.
    pub fn reject_packets(&self, error: SessionError) {
        self.state.lock().unwrap().reject_with = Some(error);
    }
}

// ---------------------------------------------------------------------------
// MockFactory
// ---------------------------------------------------------------------------

/// A session built by a [`MockFactory`], with the parameters it got.
#[derive(Clone)]
pub struct CreatedSession {
    pub params: SessionParams,
    pub session: MockSessionHandle,
}

#[derive(Default)]
struct MockFactoryState {
    created: Vec<CreatedSession>,
    fail_next: Option<SessionError>,
    complete_on_create: bool,
}

/// Factory producing [`MockSession`]s and recording each request.
pub struct MockFactory {
    state: Arc<Mutex<MockFactoryState>>,
    count: Arc<watch::Sender<usize>>,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFactory {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(MockFactoryState::default())),
            count: Arc::new(count),
        }
    }

    /// Get a clonable handle for observing created sessions.
    pub fn handle(&self) -> MockFactoryHandle {
        MockFactoryHandle {
            state: Arc::clone(&self.state),
            count: Arc::clone(&self.count),
        }
    }
}

impl SessionFactory for MockFactory {
    fn create(&self, params: SessionParams) -> Result<Arc<dyn SessionBackend>, SessionError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.fail_next.take() {
            return Err(e);
        }
        let session = MockSession::new(params.src_connection_id.clone());
        let handle = session.handle();
        if state.complete_on_create {
            handle.complete_handshake();
        }
        state.created.push(CreatedSession {
            params,
            session: handle,
        });
        let created = state.created.len();
        drop(state);
        self.count.send_replace(created);
        Ok(Arc::new(session))
    }
}

/// Clonable handle for a [`MockFactory`].
#[derive(Clone)]
pub struct MockFactoryHandle {
    state: Arc<Mutex<MockFactoryState>>,
    count: Arc<watch::Sender<usize>>,
}

impl MockFactoryHandle {
    /// Snapshot of every session created so far.
    pub fn sessions(&self) -> Vec<CreatedSession> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn session(&self, index: usize) -> Option<CreatedSession> {
        self.state.lock().unwrap().created.get(index).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().created.len()
    }

    /// Wait until at least `n` sessions exist and return the `n`-th.
    pub async fn wait_for_session(&self, n: usize) -> CreatedSession {
        let mut count = self.count.subscribe();
        let _ = count.wait_for(|created| *created >= n).await;
        self.session(n - 1).unwrap()
    }

    /// Make the next `create` fail with `error`.
    pub fn fail_next(&self, error: SessionError) {
        self.state.lock().unwrap().fail_next = Some(error);
    }

    /// Let every session created from now on complete its handshake at once.
    pub fn complete_handshakes_on_create(&self, complete: bool) {
        self.state.lock().unwrap().complete_on_create = complete;
    }
}

// ---------------------------------------------------------------------------
// SequentialConnectionIdGenerator
// ---------------------------------------------------------------------------

/// Predictable 8-byte IDs: `start`, `start + 1`, ...
pub struct SequentialConnectionIdGenerator {
    next: AtomicU64,
}

impl SequentialConnectionIdGenerator {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl ConnectionIdGenerator for SequentialConnectionIdGenerator {
    fn generate(&self) -> Result<ConnectionId, SessionError> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionId::from(id.to_be_bytes()))
    }
}
