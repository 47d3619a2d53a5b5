//! The client connection: one active session backend, the read loop that
//! feeds it, and the dial-time wait for the handshake.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use quicdial_session::{
    BackendParams, Conn, ConnectionIdGenerator, LegacyParams, NegotiationHistory, SessionBackend,
    SessionConfig, SessionError, SessionFactory, SessionParams, TlsParams, TransportParameters,
};
use quicdial_types::{ConnectionId, Scheme, SupportedVersions, VersionNumber};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dialer::SessionHandle;
use crate::error::{ClientError, PacketError};
use crate::negotiator::{NegotiationOutcome, VersionNegotiator};
use crate::validator::{validate, Validated, ValidationContext};

/// Largest datagram the read loop accepts.
pub const MAX_RECEIVE_PACKET_SIZE: usize = 1452;

/// Packet number the first packet of a TLS-based session carries.
const TLS_INITIAL_PACKET_NUMBER: u64 = 1;

/// Everything a connection is built from.
pub struct ConnectionParts {
    pub conn: Conn,
    pub hostname: String,
    pub config: Arc<SessionConfig>,
    pub tls: Option<Arc<rustls::ClientConfig>>,
    pub supported: SupportedVersions,
    pub factory: Arc<dyn SessionFactory>,
    pub connection_ids: Arc<dyn ConnectionIdGenerator>,
}

struct Inner {
    shared: Shared,
    state: Mutex<State>,
}

/// Fixed for the lifetime of the connection.
struct Shared {
    conn: Conn,
    hostname: String,
    config: Arc<SessionConfig>,
    tls: Option<Arc<rustls::ClientConfig>>,
    supported: SupportedVersions,
    factory: Arc<dyn SessionFactory>,
    connection_ids: Arc<dyn ConnectionIdGenerator>,
    /// Handed to every TLS-based session, so it survives a retry.
    peer_parameters: Arc<watch::Sender<Option<TransportParameters>>>,
}

impl Shared {
    fn create_session(
        &self,
        version: VersionNumber,
        src_connection_id: &ConnectionId,
        dest_connection_id: &ConnectionId,
        negotiator: &VersionNegotiator,
    ) -> Result<Arc<dyn SessionBackend>, SessionError> {
        let backend = match version.scheme() {
            Scheme::Legacy => BackendParams::Legacy(LegacyParams {
                initial_version: negotiator.initial_version(),
                history: negotiator.history().cloned(),
            }),
            Scheme::Tls => BackendParams::Tls(TlsParams {
                initial_version: negotiator.initial_version(),
                history: negotiator.history().cloned(),
                transport_parameters: TransportParameters::for_client(&self.config),
                peer_parameters: Arc::clone(&self.peer_parameters),
                initial_packet_number: TLS_INITIAL_PACKET_NUMBER,
            }),
        };
        debug!(
            version = %version,
            scheme = %version.scheme(),
            src = %src_connection_id,
            dest = %dest_connection_id,
            "creating session"
        );
        self.factory.create(SessionParams {
            conn: self.conn.clone(),
            hostname: self.hostname.clone(),
            version,
            src_connection_id: src_connection_id.clone(),
            dest_connection_id: dest_connection_id.clone(),
            config: Arc::clone(&self.config),
            tls: self.tls.clone(),
            backend,
        })
    }
}

struct State {
    version: VersionNumber,
    src_connection_id: ConnectionId,
    dest_connection_id: ConnectionId,
    negotiator: VersionNegotiator,
    session: Arc<dyn SessionBackend>,
    /// Bumped whenever `session` is replaced.
    generation: u64,
    /// Set when a replacement session could not be built.
    replacement_error: Option<SessionError>,
}

impl State {
    fn recreate_session(&self, shared: &Shared) -> Result<Arc<dyn SessionBackend>, SessionError> {
        shared.create_session(
            self.version,
            &self.src_connection_id,
            &self.dest_connection_id,
            &self.negotiator,
        )
    }
}

/// A client connection. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ClientConnection {
    inner: Arc<Inner>,
}

impl ClientConnection {
    /// Pick connection IDs and the initial version, and create the first
    /// session. No I/O happens until [`dial`](Self::dial).
    pub fn new(parts: ConnectionParts) -> Result<Self, ClientError> {
        let version = parts
            .config
            .versions
            .first()
            .copied()
            .ok_or_else(|| ClientError::Config("no versions configured".to_string()))?;

        let src_connection_id = parts.connection_ids.generate()?;
        let dest_connection_id = if version.uses_explicit_connection_ids() {
            parts.connection_ids.generate()?
        } else {
            src_connection_id.clone()
        };

        let (peer_parameters, _) = watch::channel(None);
        let shared = Shared {
            conn: parts.conn,
            hostname: parts.hostname,
            config: parts.config,
            tls: parts.tls,
            supported: parts.supported,
            factory: parts.factory,
            connection_ids: parts.connection_ids,
            peer_parameters: Arc::new(peer_parameters),
        };

        let negotiator = VersionNegotiator::new(version);
        let session = shared.create_session(
            version,
            &src_connection_id,
            &dest_connection_id,
            &negotiator,
        )?;
        info!(
            remote = %shared.conn.remote_addr(),
            version = %version,
            src = %src_connection_id,
            dest = %dest_connection_id,
            "starting connection"
        );

        let state = State {
            version,
            src_connection_id,
            dest_connection_id,
            negotiator,
            session,
            generation: 0,
            replacement_error: None,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                shared,
                state: Mutex::new(state),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one received datagram through validation and dispatch it.
    ///
    /// Errors describe why the datagram was dropped; none of them end the
    /// connection.
    pub fn handle_packet(&self, from: SocketAddr, data: Bytes) -> Result<(), PacketError> {
        let rcv_time = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let ctx = ValidationContext {
            remote_addr: self.inner.shared.conn.remote_addr(),
            version: state.version,
            src_connection_id: &state.src_connection_id,
            omission_requested: self.inner.shared.config.request_connection_id_omission,
        };
        match validate(&ctx, from, data, rcv_time)? {
            Validated::Reset(reset) => {
                info!(
                    remote = %from,
                    rejected_packet_number = reset.rejected_packet_number,
                    "received public reset, closing session"
                );
                state.session.close_remote(SessionError::PublicReset {
                    rejected_packet_number: reset.rejected_packet_number,
                });
                Ok(())
            }
            Validated::VersionNegotiation(offer) => self.handle_offer(state, &offer.versions),
            Validated::Packet(packet) => {
                if state.negotiator.accept_implicitly() {
                    debug!(version = %state.version, "server accepted version");
                }
                state.session.handle_packet(packet).map_err(PacketError::Session)
            }
        }
    }

    fn handle_offer(
        &self,
        state: &mut State,
        offered: &[VersionNumber],
    ) -> Result<(), PacketError> {
        let outcome = state.negotiator.on_offer(
            state.version,
            offered,
            &self.inner.shared.config.versions,
            &self.inner.shared.supported,
        )?;
        match outcome {
            NegotiationOutcome::Ignored => {}
            NegotiationOutcome::NoCommonVersion => {
                warn!(?offered, "server offers no usable version");
                state.session.close(SessionError::InvalidVersion);
            }
            NegotiationOutcome::Switch(version) => self.switch_version(state, version),
        }
        Ok(())
    }

    /// Replace the session with one speaking `version`. The old session is
    /// closed before the new one exists.
    fn switch_version(&self, state: &mut State, version: VersionNumber) {
        info!(from = %state.version, to = %version, "switching version");
        state.session.close(SessionError::ReplacedForNewVersion);
        state.version = version;

        let shared = &self.inner.shared;
        let replaced = shared.connection_ids.generate().and_then(|dest| {
            if !version.uses_explicit_connection_ids() {
                state.src_connection_id = dest.clone();
            }
            state.dest_connection_id = dest;
            state.recreate_session(shared)
        });
        match replaced {
            Ok(session) => {
                state.session = session;
                state.generation += 1;
            }
            Err(e) => {
                warn!(error = %e, "failed to create session for new version");
                state.replacement_error = Some(e);
            }
        }
    }

    /// Receive datagrams until the transport fails, then close the active
    /// session with that error.
    pub async fn listen(&self) {
        let transport = Arc::clone(self.inner.shared.conn.transport());
        let mut buf = vec![0u8; MAX_RECEIVE_PACKET_SIZE];
        loop {
            match transport.recv_from(&mut buf).await {
                Ok((n, from)) => {
                    let data = Bytes::copy_from_slice(&buf[..n]);
                    if let Err(e) = self.handle_packet(from, data) {
                        debug!(remote = %from, error = %e, "dropped packet");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "read loop stopped");
                    self.close(SessionError::from(e));
                    return;
                }
            }
        }
    }

    /// Start the read loop and wait until the handshake completes and the
    /// version is negotiated, or the attempt fails.
    pub async fn dial(&self) -> Result<SessionHandle, ClientError> {
        let listener = self.clone();
        let read_loop = tokio::spawn(async move { listener.listen().await });

        let timeout = self.inner.shared.config.handshake_timeout;
        let outcome = match tokio::time::timeout(timeout, self.establish()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(?timeout, "handshake timed out");
                self.close(SessionError::HandshakeTimeout);
                Err(SessionError::HandshakeTimeout.into())
            }
        };

        match outcome {
            Ok(()) => {
                info!(
                    remote = %self.remote_addr(),
                    version = %self.version(),
                    "connection established"
                );
                Ok(SessionHandle::new(self.clone(), read_loop))
            }
            Err(e) => {
                read_loop.abort();
                self.inner.shared.conn.transport().close();
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), ClientError> {
        let (mut session, mut generation) = self.active();
        loop {
            let result = session.run().await;
            match result {
                Ok(()) => break,
                Err(SessionError::ReplacedForNewVersion) => {
                    let (next, next_generation) = self.active();
                    if next_generation == generation {
                        let e = self
                            .lock()
                            .replacement_error
                            .take()
                            .unwrap_or(SessionError::ReplacedForNewVersion);
                        return Err(e.into());
                    }
                    session = next;
                    generation = next_generation;
                }
                Err(SessionError::Retry) => {
                    (session, generation) = self.replace_for_retry()?;
                }
                Err(e) => {
                    warn!(error = %e, "session closed during handshake");
                    return Err(e.into());
                }
            }
        }

        let mut negotiated = self.negotiated();
        negotiated
            .wait_for(|negotiated| *negotiated)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(())
    }

    fn active(&self) -> (Arc<dyn SessionBackend>, u64) {
        let state = self.lock();
        (Arc::clone(&state.session), state.generation)
    }

    fn replace_for_retry(&self) -> Result<(Arc<dyn SessionBackend>, u64), SessionError> {
        let mut state = self.lock();
        info!(version = %state.version, "server requested retry, recreating session");
        let session = state.recreate_session(&self.inner.shared)?;
        state.session = Arc::clone(&session);
        state.generation += 1;
        Ok((session, state.generation))
    }

    /// Close the active session.
    pub fn close(&self, reason: SessionError) {
        self.lock().session.close(reason);
    }

    /// Stop the transport; the read loop ends with an error.
    pub fn close_transport(&self) {
        self.inner.shared.conn.transport().close();
    }

    /// The session currently receiving packets.
    #[must_use]
    pub fn session(&self) -> Arc<dyn SessionBackend> {
        self.active().0
    }

    #[must_use]
    pub fn version(&self) -> VersionNumber {
        self.lock().version
    }

    #[must_use]
    pub fn src_connection_id(&self) -> ConnectionId {
        self.lock().src_connection_id.clone()
    }

    #[must_use]
    pub fn dest_connection_id(&self) -> ConnectionId {
        self.lock().dest_connection_id.clone()
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.shared.conn.remote_addr()
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.inner.shared.hostname
    }

    #[must_use]
    pub fn is_negotiated(&self) -> bool {
        self.lock().negotiator.is_negotiated()
    }

    /// Completion signal of version negotiation.
    #[must_use]
    pub fn negotiated(&self) -> watch::Receiver<bool> {
        self.lock().negotiator.subscribe()
    }

    #[must_use]
    pub fn negotiation_history(&self) -> Option<NegotiationHistory> {
        self.lock().negotiator.history().cloned()
    }

    /// The server's transport parameters, once a TLS-based session learned
    /// them.
    #[must_use]
    pub fn peer_parameters(&self) -> Option<TransportParameters> {
        self.inner.shared.peer_parameters.borrow().clone()
    }
}
