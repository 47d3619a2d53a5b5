//! Connection identifiers.

use std::fmt::Write as _;

/// Longest connection ID either protocol generation can carry.
pub const MAX_CONNECTION_ID_LEN: usize = 18;

/// Opaque identifier of a connection, independent of the network path.
///
/// Each connection has a source ID (picked by this client) and a destination
/// ID (picked by, or echoed from, the peer). Both display as `0x`-prefixed
/// lowercase hex, which is also how they appear in error messages.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ConnectionId(Vec<u8>);

impl ConnectionId {
    /// Wrap raw connection ID bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the ID.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the ID is zero-length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[u8; N]> for ConnectionId {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&[u8]> for ConnectionId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for ConnectionId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ConnectionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(empty)");
        }
        let mut hex = String::with_capacity(2 + self.0.len() * 2);
        hex.push_str("0x");
        for byte in &self.0 {
            let _ = write!(hex, "{byte:02x}");
        }
        f.write_str(&hex)
    }
}

impl std::fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({self})")
    }
}
