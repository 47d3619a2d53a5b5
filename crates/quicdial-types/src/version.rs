//! Protocol version numbers and the supported-version list.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A protocol revision as carried on the wire.
///
/// Two wire-incompatible generations exist: the legacy scheme (tagged
/// `Qxxx` versions) and the TLS-based scheme. [`VersionNumber::scheme`]
/// tells them apart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "VersionRepr", into = "u32")]
pub struct VersionNumber(pub u32);

impl VersionNumber {
    /// Legacy scheme, revision 39 ("Q039").
    pub const GQUIC_39: Self = Self(0x5130_3339);
    /// Legacy scheme, revision 43 ("Q043").
    pub const GQUIC_43: Self = Self(0x5130_3433);
    /// TLS-based scheme (development version).
    pub const TLS: Self = Self(101);
    /// Reserved value marking a version negotiation packet on the long header.
    pub const NEGOTIATION: Self = Self(0);

    /// Which protocol generation this version belongs to.
    #[must_use]
    pub fn scheme(self) -> Scheme {
        if self == Self::TLS {
            Scheme::Tls
        } else {
            Scheme::Legacy
        }
    }

    /// Whether packets of this version carry explicit source/destination IDs.
    #[must_use]
    pub fn uses_explicit_connection_ids(self) -> bool {
        self.scheme() == Scheme::Tls
    }

    /// Whether this is a legacy version tag of the form `Qddd`.
    fn is_legacy_tag(self) -> bool {
        let [q, a, b, c] = self.0.to_be_bytes();
        q == b'Q' && a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit()
    }
}

impl std::fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::TLS {
            return write!(f, "TLS dev version");
        }
        if self.is_legacy_tag() {
            let [_, a, b, c] = self.0.to_be_bytes();
            let revision = if a == b'0' {
                format!("{}{}", char::from(b), char::from(c))
            } else {
                format!("{}{}{}", char::from(a), char::from(b), char::from(c))
            };
            return write!(f, "gQUIC {revision}");
        }
        write!(f, "{:#x}", self.0)
    }
}

impl From<VersionNumber> for u32 {
    fn from(version: VersionNumber) -> Self {
        version.0
    }
}

impl From<u32> for VersionNumber {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid version string: {0:?}")]
pub struct ParseVersionError(String);

impl FromStr for VersionNumber {
    type Err = ParseVersionError;

    /// Accepts `Q039`-style tags, `TLS`, `0x`-prefixed hex, or decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("tls") {
            return Ok(Self::TLS);
        }
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u32::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|_| ParseVersionError(s.to_string()));
        }
        let bytes = s.as_bytes();
        if bytes.len() == 4 && bytes[0] == b'Q' && bytes[1..].iter().all(u8::is_ascii_digit) {
            return Ok(Self(u32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| ParseVersionError(s.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionRepr {
    Number(u32),
    Name(String),
}

impl TryFrom<VersionRepr> for VersionNumber {
    type Error = ParseVersionError;

    fn try_from(repr: VersionRepr) -> Result<Self, Self::Error> {
        match repr {
            VersionRepr::Number(n) => Ok(Self(n)),
            VersionRepr::Name(s) => s.parse(),
        }
    }
}

/// Protocol generation a session backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Legacy crypto handshake, public header format, single connection ID.
    Legacy,
    /// TLS 1.3 handshake, long/short header format, explicit connection IDs.
    Tls,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Tls => write!(f, "tls"),
        }
    }
}

/// Versions this build can speak, most preferred first.
pub const DEFAULT_SUPPORTED_VERSIONS: &[VersionNumber] = &[
    VersionNumber::GQUIC_43,
    VersionNumber::GQUIC_39,
    VersionNumber::TLS,
];

/// Immutable, ordered list of versions an endpoint is willing to speak.
///
/// Cheap to clone; the list is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedVersions(Arc<[VersionNumber]>);

impl SupportedVersions {
    /// Build a list from the given versions, most preferred first.
    pub fn new(versions: impl Into<Vec<VersionNumber>>) -> Self {
        Self(versions.into().into())
    }

    /// Whether `version` is in the list.
    #[must_use]
    pub fn contains(&self, version: VersionNumber) -> bool {
        self.0.contains(&version)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[VersionNumber] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SupportedVersions {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_VERSIONS)
    }
}

impl From<Vec<VersionNumber>> for SupportedVersions {
    fn from(versions: Vec<VersionNumber>) -> Self {
        Self::new(versions)
    }
}

/// Pick the first version in `ours` that also appears in `theirs`.
#[must_use]
pub fn choose_supported_version(
    ours: &[VersionNumber],
    theirs: &[VersionNumber],
) -> Option<VersionNumber> {
    ours.iter().copied().find(|v| theirs.contains(v))
}
