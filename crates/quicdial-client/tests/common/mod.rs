//! Helpers shared by the client integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use quicdial_client::{ClientConfig, ClientConnection, Dialer};
use quicdial_session::mock::{
    CreatedSession, MockFactory, MockFactoryHandle, MockSessionHandle, MockTransport,
    MockTransportHandle, SequentialConnectionIdGenerator,
};
use quicdial_types::{ConnectionId, Perspective, SupportedVersions, VersionNumber};
use quicdial_wire::{Header, PacketNumberLen, PublicHeader, ShortHeader};
use tracing_subscriber::EnvFilter;

/// First connection ID the sequential generator hands out.
pub const FIRST_ID: u64 = 0x1337;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

pub fn peer() -> SocketAddr {
    "192.0.2.1:4433".parse().unwrap()
}

pub fn local() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

pub fn id(n: u64) -> ConnectionId {
    ConnectionId::from(n.to_be_bytes())
}

/// A connection over a mock transport whose sessions come from a mock
/// factory.
pub struct Harness {
    pub connection: ClientConnection,
    pub factory: MockFactoryHandle,
    pub transport: MockTransportHandle,
}

impl Harness {
    /// Connect with `config`, speaking `supported`.
    pub fn new(config: &ClientConfig, supported: SupportedVersions) -> Self {
        init_tracing();
        let factory = MockFactory::new();
        let factory_handle = factory.handle();
        let (transport, transport_handle) = MockTransport::new(local());
        let connection = dialer(factory, supported)
            .connect(
                Arc::new(transport),
                peer(),
                "quic.example.org:4433",
                None,
                config,
            )
            .unwrap();
        Self {
            connection,
            factory: factory_handle,
            transport: transport_handle,
        }
    }

    /// A legacy connection with default settings.
    pub fn legacy() -> Self {
        Self::new(&ClientConfig::default(), SupportedVersions::default())
    }

    /// A connection starting with the TLS-based version.
    pub fn tls() -> Self {
        let config = ClientConfig {
            versions: vec![VersionNumber::TLS, VersionNumber::GQUIC_39],
            ..ClientConfig::default()
        };
        Self::new(&config, SupportedVersions::default())
    }

    pub fn created(&self, index: usize) -> CreatedSession {
        self.factory.session(index).unwrap()
    }

    pub fn session(&self, index: usize) -> MockSessionHandle {
        self.created(index).session
    }

    /// Feed `data` to the connection as if it came from the peer.
    pub fn receive(&self, data: Bytes) -> Result<(), quicdial_client::PacketError> {
        self.connection.handle_packet(peer(), data)
    }
}

pub fn dialer(factory: MockFactory, supported: SupportedVersions) -> Dialer {
    Dialer::new(Arc::new(factory))
        .with_supported_versions(supported)
        .with_connection_id_generator(Arc::new(SequentialConnectionIdGenerator::new(FIRST_ID)))
}

/// A legacy packet from the server, without a version flag.
pub fn legacy_packet(connection_id: Option<&ConnectionId>, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    Header::Public(PublicHeader {
        connection_id: connection_id.cloned(),
        version: None,
        packet_number: 1,
        packet_number_len: PacketNumberLen::Two,
    })
    .write(&mut buf, Perspective::Server)
    .unwrap();
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// A short header packet from the server.
pub fn short_packet(dest: &ConnectionId, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    Header::Short(ShortHeader {
        dest_connection_id: Some(dest.clone()),
        key_phase: false,
        packet_number: 1,
        packet_number_len: PacketNumberLen::Two,
    })
    .write(&mut buf, Perspective::Server)
    .unwrap();
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// Wait for a condition with a deadline.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
