//! Client configuration loaded from TOML.

use std::time::Duration;

use quicdial_session::SessionConfig;
use quicdial_types::{SupportedVersions, VersionNumber};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Incoming stream limit used when none is configured.
pub const DEFAULT_MAX_INCOMING_STREAMS: u32 = 100;

/// Settings for one dial.
///
/// ```toml
/// versions = ["Q043", "TLS"]
/// handshake_timeout_ms = 5000
/// max_incoming_uni_streams = -1   # disabled
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Versions to offer, most preferred first. Empty means every supported
    /// version.
    #[serde(default)]
    pub versions: Vec<VersionNumber>,
    /// 0 means the default.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// 0 means the default.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default)]
    pub request_connection_id_omission: bool,
    /// Zero or negative disables incoming bidirectional streams.
    #[serde(default)]
    pub max_incoming_streams: Option<i64>,
    /// Zero or negative disables incoming unidirectional streams.
    #[serde(default)]
    pub max_incoming_uni_streams: Option<i64>,
    /// Overrides the host taken from the dial address for certificate
    /// verification.
    #[serde(default)]
    pub server_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            request_connection_id_omission: false,
            max_incoming_streams: None,
            max_incoming_uni_streams: None,
            server_name: None,
        }
    }
}

impl ClientConfig {
    /// Apply defaults and check every configured version against `supported`.
    pub fn populate(&self, supported: &SupportedVersions) -> Result<SessionConfig, ClientError> {
        if supported.is_empty() {
            return Err(ClientError::Config("no supported versions".to_string()));
        }
        if let Some(v) = self.versions.iter().find(|v| !supported.contains(**v)) {
            return Err(ClientError::InvalidVersion(*v));
        }
        let versions = if self.versions.is_empty() {
            supported.as_slice().to_vec()
        } else {
            self.versions.clone()
        };

        Ok(SessionConfig {
            versions,
            handshake_timeout: millis_or(self.handshake_timeout_ms, default_handshake_timeout_ms()),
            idle_timeout: millis_or(self.idle_timeout_ms, default_idle_timeout_ms()),
            request_connection_id_omission: self.request_connection_id_omission,
            max_incoming_streams: stream_limit(self.max_incoming_streams),
            max_incoming_uni_streams: stream_limit(self.max_incoming_uni_streams),
        })
    }
}

fn millis_or(ms: u64, default: u64) -> Duration {
    Duration::from_millis(if ms == 0 { default } else { ms })
}

fn stream_limit(configured: Option<i64>) -> u32 {
    match configured {
        None => DEFAULT_MAX_INCOMING_STREAMS,
        Some(n) if n <= 0 => 0,
        Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
    }
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_idle_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(config.versions.is_empty());
        assert_eq!(config.handshake_timeout_ms, 10_000);
        assert_eq!(config.idle_timeout_ms, 30_000);
        assert!(!config.request_connection_id_omission);
        assert!(config.server_name.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
versions = ["Q039", "TLS"]
handshake_timeout_ms = 1337
idle_timeout_ms = 42000
request_connection_id_omission = true
max_incoming_streams = 1234
max_incoming_uni_streams = 4321
server_name = "quic.example.org"
"#;
        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.versions, vec![VersionNumber::GQUIC_39, VersionNumber::TLS]);
        assert_eq!(config.server_name.as_deref(), Some("quic.example.org"));

        let populated = config.populate(&SupportedVersions::default()).unwrap();
        assert_eq!(populated.handshake_timeout, Duration::from_millis(1337));
        assert_eq!(populated.idle_timeout, Duration::from_secs(42));
        assert!(populated.request_connection_id_omission);
        assert_eq!(populated.max_incoming_streams, 1234);
        assert_eq!(populated.max_incoming_uni_streams, 4321);
    }

    #[test]
    fn defaults_are_filled_in() {
        let populated = ClientConfig::default()
            .populate(&SupportedVersions::default())
            .unwrap();
        assert_eq!(populated.versions, SupportedVersions::default().as_slice());
        assert_eq!(populated.handshake_timeout, Duration::from_secs(10));
        assert_eq!(populated.idle_timeout, Duration::from_secs(30));
        assert_eq!(populated.max_incoming_streams, DEFAULT_MAX_INCOMING_STREAMS);
        assert_eq!(populated.max_incoming_uni_streams, DEFAULT_MAX_INCOMING_STREAMS);
    }

    #[test]
    fn zero_timeouts_mean_defaults() {
        let config = ClientConfig {
            handshake_timeout_ms: 0,
            idle_timeout_ms: 0,
            ..ClientConfig::default()
        };
        let populated = config.populate(&SupportedVersions::default()).unwrap();
        assert_eq!(populated.handshake_timeout, Duration::from_secs(10));
        assert_eq!(populated.idle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn negative_stream_limits_disable_streams() {
        let config = ClientConfig {
            max_incoming_streams: Some(-1),
            max_incoming_uni_streams: Some(0),
            ..ClientConfig::default()
        };
        let populated = config.populate(&SupportedVersions::default()).unwrap();
        assert_eq!(populated.max_incoming_streams, 0);
        assert_eq!(populated.max_incoming_uni_streams, 0);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let config = ClientConfig {
            versions: vec![VersionNumber(0x1234)],
            ..ClientConfig::default()
        };
        let err = config.populate(&SupportedVersions::default()).unwrap_err();
        assert_eq!(err.to_string(), "0x1234 is not a valid QUIC version");
    }

    #[test]
    fn empty_supported_list_is_a_config_error() {
        let err = ClientConfig::default()
            .populate(&SupportedVersions::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
