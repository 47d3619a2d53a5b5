//! Packet headers of both protocol generations.
//!
//! Legacy public header:
//!   [flags][connection ID (8, optional)]
//!   [version (4, client only) | versions... | reset body][packet number (1/2/4/6)]
//!
//! Long header:
//!   [0x80 | type][version (4)][DCIL/SCIL][DCID][SCID][payload length (varint)][packet number (4)]
//!
//! Short header:
//!   [flags][DCID (8, optional)][packet number (1/2/4)]
//!
//! A first byte with the high bit clear is ambiguous between the legacy public
//! header and the short header; the receiver's current version decides.

use bytes::{Buf, BufMut, BytesMut};
use quicdial_types::{ConnectionId, Perspective, VersionNumber, MAX_CONNECTION_ID_LEN};
use tracing::trace;

use crate::error::WireError;
use crate::varint;

/// Length of the connection ID carried by legacy public headers.
pub const LEGACY_CONNECTION_ID_LEN: usize = 8;

/// Length of the destination connection ID carried by short headers.
pub const SHORT_HEADER_CONNECTION_ID_LEN: usize = 8;

const LONG_HEADER_BIT: u8 = 0x80;

const PUBLIC_FLAG_VERSION: u8 = 0x01;
const PUBLIC_FLAG_RESET: u8 = 0x02;
const PUBLIC_FLAG_CONNECTION_ID: u8 = 0x08;
const PUBLIC_FLAG_PACKET_NUMBER_LEN: u8 = 0x30;
const PUBLIC_FLAGS_RESERVED: u8 = 0x44;

const SHORT_FLAG_OMIT_CONNECTION_ID: u8 = 0x40;
const SHORT_FLAG_KEY_PHASE: u8 = 0x20;
const SHORT_PACKET_NUMBER_LEN_MASK: u8 = 0x03;

/// Encoded length of a packet number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketNumberLen {
    One,
    Two,
    Four,
    Six,
}

impl PacketNumberLen {
    /// Number of bytes on the wire.
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Six => 6,
        }
    }

    fn from_public_flags(flags: u8) -> Self {
        match (flags & PUBLIC_FLAG_PACKET_NUMBER_LEN) >> 4 {
            0 => Self::One,
            1 => Self::Two,
            2 => Self::Four,
            _ => Self::Six,
        }
    }

    fn public_flags(self) -> u8 {
        match self {
            Self::One => 0x00,
            Self::Two => 0x10,
            Self::Four => 0x20,
            Self::Six => 0x30,
        }
    }

    fn from_short_flags(flags: u8) -> Result<Self, WireError> {
        match flags & SHORT_PACKET_NUMBER_LEN_MASK {
            0 => Ok(Self::One),
            1 => Ok(Self::Two),
            2 => Ok(Self::Four),
            _ => Err(WireError::InvalidShortHeaderFlags(flags)),
        }
    }

    fn short_flags(self) -> Result<u8, WireError> {
        match self {
            Self::One => Ok(0),
            Self::Two => Ok(1),
            Self::Four => Ok(2),
            Self::Six => Err(WireError::InvalidShortHeaderFlags(SHORT_PACKET_NUMBER_LEN_MASK)),
        }
    }
}

/// Packet type carried in the low bits of a long header's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPacketType {
    Initial,
    Retry,
    Handshake,
    ZeroRtt,
}

impl LongPacketType {
    fn from_byte(byte: u8) -> Result<Self, WireError> {
        match byte & !LONG_HEADER_BIT {
            0x7f => Ok(Self::Initial),
            0x7e => Ok(Self::Retry),
            0x7d => Ok(Self::Handshake),
            0x7c => Ok(Self::ZeroRtt),
            other => Err(WireError::UnknownLongPacketType(other)),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Initial => 0x7f,
            Self::Retry => 0x7e,
            Self::Handshake => 0x7d,
            Self::ZeroRtt => 0x7c,
        }
    }
}

/// Which header layout a version negotiation packet used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderForm {
    /// Legacy public header with the version flag set.
    Public,
    /// Long header with version 0.
    Long,
}

/// Regular legacy packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicHeader {
    /// `None` when the sender truncated (omitted) the connection ID.
    pub connection_id: Option<ConnectionId>,
    /// Only present on packets sent by a client.
    pub version: Option<VersionNumber>,
    pub packet_number: u64,
    pub packet_number_len: PacketNumberLen,
}

/// Legacy packet with the reset flag set. The reset body follows the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicResetHeader {
    pub connection_id: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongHeader {
    pub packet_type: LongPacketType,
    pub version: VersionNumber,
    pub dest_connection_id: ConnectionId,
    pub src_connection_id: ConnectionId,
    /// Number of bytes following the header that belong to this packet.
    pub payload_len: u64,
    pub packet_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortHeader {
    /// `None` when the sender omitted the connection ID.
    pub dest_connection_id: Option<ConnectionId>,
    pub key_phase: bool,
    pub packet_number: u64,
    pub packet_number_len: PacketNumberLen,
}

/// A server's list of versions it is willing to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionNegotiationHeader {
    pub form: HeaderForm,
    pub dest_connection_id: Option<ConnectionId>,
    pub src_connection_id: Option<ConnectionId>,
    pub versions: Vec<VersionNumber>,
}

/// A parsed packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Public(PublicHeader),
    PublicReset(PublicResetHeader),
    Long(LongHeader),
    Short(ShortHeader),
    VersionNegotiation(VersionNegotiationHeader),
}

impl Header {
    /// Parse the header at the start of `data`.
    ///
    /// `sender` is the perspective of the endpoint that sent the packet;
    /// `version` is the version the receiver currently speaks, used to tell a
    /// legacy public header from a short header. Returns the header and the
    /// number of bytes it occupied.
    pub fn parse(
        data: &[u8],
        sender: Perspective,
        version: VersionNumber,
    ) -> Result<(Self, usize), WireError> {
        let mut buf = data;
        need(&buf, 1, "first byte")?;
        let first = buf.get_u8();

        let header = if first & LONG_HEADER_BIT != 0 {
            parse_long(first, &mut buf)?
        } else if version.uses_explicit_connection_ids() {
            parse_short(first, &mut buf)?
        } else {
            parse_public(first, &mut buf, sender)?
        };

        let consumed = data.len() - buf.remaining();
        trace!(len = consumed, ?sender, "parsed header");
        Ok((header, consumed))
    }

    /// Serialize the header into `buf`, as sent by `sender`.
    pub fn write(&self, buf: &mut BytesMut, sender: Perspective) -> Result<(), WireError> {
        match self {
            Self::Public(h) => write_public(h, buf, sender),
            Self::PublicReset(h) => {
                let mut flags = PUBLIC_FLAG_RESET;
                if h.connection_id.is_some() {
                    flags |= PUBLIC_FLAG_CONNECTION_ID;
                }
                buf.put_u8(flags);
                if let Some(id) = &h.connection_id {
                    put_legacy_connection_id(buf, id)?;
                }
                Ok(())
            }
            Self::Long(h) => write_long(h, buf),
            Self::Short(h) => write_short(h, buf),
            Self::VersionNegotiation(h) => write_version_negotiation(h, buf),
        }
    }

    #[must_use]
    pub fn is_long_header(&self) -> bool {
        match self {
            Self::Long(_) => true,
            Self::VersionNegotiation(h) => h.form == HeaderForm::Long,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_version_negotiation(&self) -> bool {
        matches!(self, Self::VersionNegotiation(_))
    }

    #[must_use]
    pub fn is_public_reset(&self) -> bool {
        matches!(self, Self::PublicReset(_))
    }

    /// Whether the sender left out the connection ID.
    #[must_use]
    pub fn omits_connection_id(&self) -> bool {
        match self {
            Self::Public(h) => h.connection_id.is_none(),
            Self::PublicReset(h) => h.connection_id.is_none(),
            Self::Short(h) => h.dest_connection_id.is_none(),
            Self::VersionNegotiation(h) => h.dest_connection_id.is_none(),
            Self::Long(_) => false,
        }
    }

    /// The connection ID the packet is addressed to, if it carries one.
    #[must_use]
    pub fn destination_connection_id(&self) -> Option<&ConnectionId> {
        match self {
            Self::Public(h) => h.connection_id.as_ref(),
            Self::PublicReset(h) => h.connection_id.as_ref(),
            Self::Long(h) => Some(&h.dest_connection_id),
            Self::Short(h) => h.dest_connection_id.as_ref(),
            Self::VersionNegotiation(h) => h.dest_connection_id.as_ref(),
        }
    }

    /// Declared payload length, for long headers.
    #[must_use]
    pub fn payload_len(&self) -> Option<u64> {
        match self {
            Self::Long(h) => Some(h.payload_len),
            _ => None,
        }
    }

    /// The version field, when the header carries one.
    #[must_use]
    pub fn version(&self) -> Option<VersionNumber> {
        match self {
            Self::Public(h) => h.version,
            Self::Long(h) => Some(h.version),
            _ => None,
        }
    }
}

fn need(buf: &&[u8], n: usize, what: &'static str) -> Result<(), WireError> {
    if buf.remaining() < n {
        return Err(WireError::UnexpectedEnd(what));
    }
    Ok(())
}

fn take_connection_id(
    buf: &mut &[u8],
    len: usize,
    what: &'static str,
) -> Result<ConnectionId, WireError> {
    need(buf, len, what)?;
    let id = ConnectionId::from(&buf[..len]);
    buf.advance(len);
    Ok(id)
}

fn parse_version_list(buf: &mut &[u8]) -> Result<Vec<VersionNumber>, WireError> {
    let len = buf.remaining();
    if len == 0 {
        return Err(WireError::EmptyVersionList);
    }
    if len % 4 != 0 {
        return Err(WireError::MalformedVersionList(len));
    }
    let mut versions = Vec::with_capacity(len / 4);
    while buf.has_remaining() {
        versions.push(VersionNumber(buf.get_u32()));
    }
    Ok(versions)
}

fn parse_public(first: u8, buf: &mut &[u8], sender: Perspective) -> Result<Header, WireError> {
    if first & PUBLIC_FLAGS_RESERVED != 0 {
        return Err(WireError::InvalidPublicFlags(first));
    }

    let connection_id = if first & PUBLIC_FLAG_CONNECTION_ID != 0 {
        Some(take_connection_id(
            buf,
            LEGACY_CONNECTION_ID_LEN,
            "connection ID",
        )?)
    } else {
        None
    };

    if first & PUBLIC_FLAG_RESET != 0 {
        return Ok(Header::PublicReset(PublicResetHeader { connection_id }));
    }

    let mut version = None;
    if first & PUBLIC_FLAG_VERSION != 0 {
        match sender {
            Perspective::Server => {
                let versions = parse_version_list(buf)?;
                return Ok(Header::VersionNegotiation(VersionNegotiationHeader {
                    form: HeaderForm::Public,
                    src_connection_id: connection_id.clone(),
                    dest_connection_id: connection_id,
                    versions,
                }));
            }
            Perspective::Client => {
                need(buf, 4, "version")?;
                version = Some(VersionNumber(buf.get_u32()));
            }
        }
    }

    let packet_number_len = PacketNumberLen::from_public_flags(first);
    need(buf, packet_number_len.bytes(), "packet number")?;
    let packet_number = buf.get_uint(packet_number_len.bytes());

    Ok(Header::Public(PublicHeader {
        connection_id,
        version,
        packet_number,
        packet_number_len,
    }))
}

fn decode_connection_id_len(nibble: u8) -> usize {
    if nibble == 0 {
        0
    } else {
        usize::from(nibble) + 3
    }
}

fn encode_connection_id_len(id: &ConnectionId) -> Result<u8, WireError> {
    match id.len() {
        0 => Ok(0),
        len @ 4..=MAX_CONNECTION_ID_LEN => {
            u8::try_from(len - 3).map_err(|_| WireError::InvalidConnectionIdLength(len))
        }
        len => Err(WireError::InvalidConnectionIdLength(len)),
    }
}

fn parse_long(first: u8, buf: &mut &[u8]) -> Result<Header, WireError> {
    need(buf, 4, "version")?;
    let version = VersionNumber(buf.get_u32());

    need(buf, 1, "connection ID lengths")?;
    let lengths = buf.get_u8();
    let dest_connection_id = take_connection_id(
        buf,
        decode_connection_id_len(lengths >> 4),
        "destination connection ID",
    )?;
    let src_connection_id = take_connection_id(
        buf,
        decode_connection_id_len(lengths & 0x0f),
        "source connection ID",
    )?;

    if version == VersionNumber::NEGOTIATION {
        let versions = parse_version_list(buf)?;
        return Ok(Header::VersionNegotiation(VersionNegotiationHeader {
            form: HeaderForm::Long,
            dest_connection_id: Some(dest_connection_id),
            src_connection_id: Some(src_connection_id),
            versions,
        }));
    }

    let packet_type = LongPacketType::from_byte(first)?;
    let payload_len = varint::read(buf)?;
    need(buf, 4, "packet number")?;
    let packet_number = buf.get_u32();

    Ok(Header::Long(LongHeader {
        packet_type,
        version,
        dest_connection_id,
        src_connection_id,
        payload_len,
        packet_number,
    }))
}

fn parse_short(first: u8, buf: &mut &[u8]) -> Result<Header, WireError> {
    let packet_number_len = PacketNumberLen::from_short_flags(first)?;
    let dest_connection_id = if first & SHORT_FLAG_OMIT_CONNECTION_ID == 0 {
        Some(take_connection_id(
            buf,
            SHORT_HEADER_CONNECTION_ID_LEN,
            "destination connection ID",
        )?)
    } else {
        None
    };
    need(buf, packet_number_len.bytes(), "packet number")?;
    let packet_number = buf.get_uint(packet_number_len.bytes());

    Ok(Header::Short(ShortHeader {
        dest_connection_id,
        key_phase: first & SHORT_FLAG_KEY_PHASE != 0,
        packet_number,
        packet_number_len,
    }))
}

fn put_legacy_connection_id(buf: &mut BytesMut, id: &ConnectionId) -> Result<(), WireError> {
    if id.len() != LEGACY_CONNECTION_ID_LEN {
        return Err(WireError::InvalidConnectionIdLength(id.len()));
    }
    buf.put_slice(id.as_bytes());
    Ok(())
}

fn put_packet_number(
    buf: &mut BytesMut,
    number: u64,
    len: PacketNumberLen,
) -> Result<(), WireError> {
    let bits = len.bytes() * 8;
    if bits < 64 && number >> bits != 0 {
        return Err(WireError::PacketNumberTooLarge {
            number,
            len: len.bytes(),
        });
    }
    buf.put_uint(number, len.bytes());
    Ok(())
}

fn write_public(
    h: &PublicHeader,
    buf: &mut BytesMut,
    sender: Perspective,
) -> Result<(), WireError> {
    let carries_version = sender == Perspective::Client && h.version.is_some();
    let mut flags = h.packet_number_len.public_flags();
    if h.connection_id.is_some() {
        flags |= PUBLIC_FLAG_CONNECTION_ID;
    }
    if carries_version {
        flags |= PUBLIC_FLAG_VERSION;
    }
    buf.put_u8(flags);
    if let Some(id) = &h.connection_id {
        put_legacy_connection_id(buf, id)?;
    }
    if let (true, Some(version)) = (carries_version, h.version) {
        buf.put_u32(version.0);
    }
    put_packet_number(buf, h.packet_number, h.packet_number_len)
}

fn put_long_connection_ids(
    buf: &mut BytesMut,
    dest: &ConnectionId,
    src: &ConnectionId,
) -> Result<(), WireError> {
    let lengths = (encode_connection_id_len(dest)? << 4) | encode_connection_id_len(src)?;
    buf.put_u8(lengths);
    buf.put_slice(dest.as_bytes());
    buf.put_slice(src.as_bytes());
    Ok(())
}

fn write_long(h: &LongHeader, buf: &mut BytesMut) -> Result<(), WireError> {
    buf.put_u8(LONG_HEADER_BIT | h.packet_type.to_byte());
    buf.put_u32(h.version.0);
    put_long_connection_ids(buf, &h.dest_connection_id, &h.src_connection_id)?;
    varint::write(buf, h.payload_len)?;
    buf.put_u32(h.packet_number);
    Ok(())
}

fn write_short(h: &ShortHeader, buf: &mut BytesMut) -> Result<(), WireError> {
    let mut flags = h.packet_number_len.short_flags()?;
    if h.dest_connection_id.is_none() {
        flags |= SHORT_FLAG_OMIT_CONNECTION_ID;
    }
    if h.key_phase {
        flags |= SHORT_FLAG_KEY_PHASE;
    }
    buf.put_u8(flags);
    if let Some(id) = &h.dest_connection_id {
        if id.len() != SHORT_HEADER_CONNECTION_ID_LEN {
            return Err(WireError::InvalidConnectionIdLength(id.len()));
        }
        buf.put_slice(id.as_bytes());
    }
    put_packet_number(buf, h.packet_number, h.packet_number_len)
}

fn write_version_negotiation(
    h: &VersionNegotiationHeader,
    buf: &mut BytesMut,
) -> Result<(), WireError> {
    if h.versions.is_empty() {
        return Err(WireError::EmptyVersionList);
    }
    match h.form {
        HeaderForm::Public => {
            let mut flags = PUBLIC_FLAG_VERSION;
            if h.dest_connection_id.is_some() {
                flags |= PUBLIC_FLAG_CONNECTION_ID;
            }
            buf.put_u8(flags);
            if let Some(id) = &h.dest_connection_id {
                put_legacy_connection_id(buf, id)?;
            }
        }
        HeaderForm::Long => {
            let empty = ConnectionId::default();
            buf.put_u8(LONG_HEADER_BIT);
            buf.put_u32(VersionNumber::NEGOTIATION.0);
            put_long_connection_ids(
                buf,
                h.dest_connection_id.as_ref().unwrap_or(&empty),
                h.src_connection_id.as_ref().unwrap_or(&empty),
            )?;
        }
    }
    for version in &h.versions {
        buf.put_u32(version.0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid() -> ConnectionId {
        ConnectionId::from([0, 0, 0, 0, 0, 0, 0x13, 0x37])
    }

    fn encode(header: &Header, sender: Perspective) -> Vec<u8> {
        let mut buf = BytesMut::new();
        header.write(&mut buf, sender).unwrap();
        buf.to_vec()
    }

    #[test]
    fn public_header_from_server() {
        let header = Header::Public(PublicHeader {
            connection_id: Some(cid()),
            version: None,
            packet_number: 0x1337,
            packet_number_len: PacketNumberLen::Two,
        });
        let bytes = encode(&header, Perspective::Server);
        assert_eq!(bytes.len(), 1 + 8 + 2);

        let (parsed, len) =
            Header::parse(&bytes, Perspective::Server, VersionNumber::GQUIC_39).unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(parsed, header);
        assert!(!parsed.omits_connection_id());
        assert_eq!(parsed.version(), None);
    }

    #[test]
    fn public_header_from_client_carries_version() {
        let header = Header::Public(PublicHeader {
            connection_id: Some(cid()),
            version: Some(VersionNumber::GQUIC_43),
            packet_number: 1,
            packet_number_len: PacketNumberLen::One,
        });
        let bytes = encode(&header, Perspective::Client);
        assert_eq!(bytes[0] & PUBLIC_FLAG_VERSION, PUBLIC_FLAG_VERSION);

        let (parsed, _) =
            Header::parse(&bytes, Perspective::Client, VersionNumber::GQUIC_43).unwrap();
        assert_eq!(parsed.version(), Some(VersionNumber::GQUIC_43));
    }

    #[test]
    fn truncated_connection_id_is_reported() {
        let header = Header::Public(PublicHeader {
            connection_id: None,
            version: None,
            packet_number: 1,
            packet_number_len: PacketNumberLen::One,
        });
        let bytes = encode(&header, Perspective::Server);
        let (parsed, _) =
            Header::parse(&bytes, Perspective::Server, VersionNumber::GQUIC_39).unwrap();
        assert!(parsed.omits_connection_id());
        assert_eq!(parsed.destination_connection_id(), None);
    }

    #[test]
    fn reserved_public_flags_rejected() {
        let err = Header::parse(b"invalid packet", Perspective::Server, VersionNumber::GQUIC_39)
            .unwrap_err();
        assert_eq!(err, WireError::InvalidPublicFlags(b'i'));
    }

    #[test]
    fn long_header_with_payload_length() {
        let header = Header::Long(LongHeader {
            packet_type: LongPacketType::Handshake,
            version: VersionNumber::TLS,
            dest_connection_id: ConnectionId::from([1, 2, 3, 4, 5, 6, 7, 8]),
            src_connection_id: cid(),
            payload_len: 1000,
            packet_number: 42,
        });
        let mut bytes = encode(&header, Perspective::Server);
        let header_len = bytes.len();
        bytes.extend_from_slice(&[0u8; 16]);

        let (parsed, len) =
            Header::parse(&bytes, Perspective::Server, VersionNumber::GQUIC_39).unwrap();
        assert_eq!(len, header_len);
        assert!(parsed.is_long_header());
        assert_eq!(parsed.payload_len(), Some(1000));
        assert_eq!(parsed, header);
    }

    #[test]
    fn unknown_long_packet_type() {
        let mut bytes = encode(
            &Header::Long(LongHeader {
                packet_type: LongPacketType::Initial,
                version: VersionNumber::TLS,
                dest_connection_id: cid(),
                src_connection_id: cid(),
                payload_len: 0,
                packet_number: 1,
            }),
            Perspective::Client,
        );
        bytes[0] = 0x80 | 0x10;
        assert_eq!(
            Header::parse(&bytes, Perspective::Client, VersionNumber::TLS).unwrap_err(),
            WireError::UnknownLongPacketType(0x10)
        );
    }

    #[test]
    fn truncated_long_header() {
        let bytes = encode(
            &Header::Long(LongHeader {
                packet_type: LongPacketType::Initial,
                version: VersionNumber::TLS,
                dest_connection_id: cid(),
                src_connection_id: cid(),
                payload_len: 10,
                packet_number: 1,
            }),
            Perspective::Client,
        );
        let err = Header::parse(&bytes[..16], Perspective::Client, VersionNumber::TLS).unwrap_err();
        assert_eq!(err, WireError::UnexpectedEnd("source connection ID"));
    }

    #[test]
    fn short_header_depends_on_version() {
        let header = Header::Short(ShortHeader {
            dest_connection_id: Some(ConnectionId::from([8, 7, 6, 5, 4, 3, 2, 1])),
            key_phase: true,
            packet_number: 7,
            packet_number_len: PacketNumberLen::One,
        });
        let bytes = encode(&header, Perspective::Server);

        let (parsed, _) = Header::parse(&bytes, Perspective::Server, VersionNumber::TLS).unwrap();
        assert_eq!(parsed, header);

        // The same bytes read as a legacy public header mean something else.
        let (legacy, _) =
            Header::parse(&bytes, Perspective::Server, VersionNumber::GQUIC_39).unwrap();
        assert!(matches!(legacy, Header::Public(_)));
    }

    #[test]
    fn short_header_omitted_connection_id() {
        let header = Header::Short(ShortHeader {
            dest_connection_id: None,
            key_phase: false,
            packet_number: 1,
            packet_number_len: PacketNumberLen::Four,
        });
        let bytes = encode(&header, Perspective::Server);
        assert_eq!(bytes.len(), 5);
        let (parsed, _) = Header::parse(&bytes, Perspective::Server, VersionNumber::TLS).unwrap();
        assert!(parsed.omits_connection_id());
    }

    #[test]
    fn short_header_rejects_six_byte_packet_numbers() {
        let header = Header::Short(ShortHeader {
            dest_connection_id: None,
            key_phase: false,
            packet_number: 1,
            packet_number_len: PacketNumberLen::Six,
        });
        assert!(header.write(&mut BytesMut::new(), Perspective::Server).is_err());
    }

    #[test]
    fn packet_number_must_fit() {
        let header = Header::Public(PublicHeader {
            connection_id: Some(cid()),
            version: None,
            packet_number: 0x1_0000,
            packet_number_len: PacketNumberLen::Two,
        });
        assert_eq!(
            header.write(&mut BytesMut::new(), Perspective::Server),
            Err(WireError::PacketNumberTooLarge {
                number: 0x1_0000,
                len: 2
            })
        );
    }

    #[test]
    fn legacy_connection_id_must_be_eight_bytes() {
        let header = Header::Public(PublicHeader {
            connection_id: Some(ConnectionId::from([1, 2, 3])),
            version: None,
            packet_number: 1,
            packet_number_len: PacketNumberLen::One,
        });
        assert_eq!(
            header.write(&mut BytesMut::new(), Perspective::Server),
            Err(WireError::InvalidConnectionIdLength(3))
        );
    }

    #[test]
    fn version_list_must_be_whole_versions() {
        let mut bytes = vec![PUBLIC_FLAG_VERSION | PUBLIC_FLAG_CONNECTION_ID];
        bytes.extend_from_slice(cid().as_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 77, 0, 0]);
        assert_eq!(
            Header::parse(&bytes, Perspective::Server, VersionNumber::GQUIC_39).unwrap_err(),
            WireError::MalformedVersionList(6)
        );

        bytes.truncate(9);
        assert_eq!(
            Header::parse(&bytes, Perspective::Server, VersionNumber::GQUIC_39).unwrap_err(),
            WireError::EmptyVersionList
        );
    }
}
