//! Resolved per-connection settings.

use std::time::Duration;

use quicdial_types::VersionNumber;

/// Receive window offered per stream.
pub const STREAM_FLOW_CONTROL_WINDOW: u32 = 32 * 1024;

/// Receive window offered for the whole connection.
pub const CONNECTION_FLOW_CONTROL_WINDOW: u32 = 48 * 1024;

/// Settings a session backend runs with, after defaults were applied and
/// the version list was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Versions the client will speak, most preferred first. Never empty.
    pub versions: Vec<VersionNumber>,
    pub handshake_timeout: Duration,
    pub idle_timeout: Duration,
    pub request_connection_id_omission: bool,
    /// 0 disables incoming bidirectional streams.
    pub max_incoming_streams: u32,
    /// 0 disables incoming unidirectional streams.
    pub max_incoming_uni_streams: u32,
}

/// Transport parameters the client announces during a TLS-based handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportParameters {
    pub stream_flow_control_window: u32,
    pub connection_flow_control_window: u32,
    pub idle_timeout: Duration,
    pub omit_connection_id: bool,
    pub max_bidi_streams: u32,
    pub max_uni_streams: u32,
}

impl TransportParameters {
    /// The parameters a client with `config` announces.
    #[must_use]
    pub fn for_client(config: &SessionConfig) -> Self {
        Self {
            stream_flow_control_window: STREAM_FLOW_CONTROL_WINDOW,
            connection_flow_control_window: CONNECTION_FLOW_CONTROL_WINDOW,
            idle_timeout: config.idle_timeout,
            omit_connection_id: config.request_connection_id_omission,
            max_bidi_streams: config.max_incoming_streams,
            max_uni_streams: config.max_incoming_uni_streams,
        }
    }
}
