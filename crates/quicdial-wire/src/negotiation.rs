//! Version negotiation packets, as a server would send them.
//!
//! Clients never send these; the composers exist for servers embedding this
//! codec and for driving the client in tests.

use bytes::{Bytes, BytesMut};
use quicdial_types::{ConnectionId, Perspective, VersionNumber};

use crate::error::WireError;
use crate::header::{Header, HeaderForm, VersionNegotiationHeader};

/// Compose a legacy (public header) version negotiation packet.
pub fn compose_legacy_version_negotiation(
    connection_id: &ConnectionId,
    versions: &[VersionNumber],
) -> Result<Bytes, WireError> {
    compose(VersionNegotiationHeader {
        form: HeaderForm::Public,
        dest_connection_id: Some(connection_id.clone()),
        src_connection_id: Some(connection_id.clone()),
        versions: versions.to_vec(),
    })
}

/// Compose a long header version negotiation packet.
///
/// `dest` is the ID the client chose as its source ID.
pub fn compose_version_negotiation(
    dest: &ConnectionId,
    src: &ConnectionId,
    versions: &[VersionNumber],
) -> Result<Bytes, WireError> {
    compose(VersionNegotiationHeader {
        form: HeaderForm::Long,
        dest_connection_id: Some(dest.clone()),
        src_connection_id: Some(src.clone()),
        versions: versions.to_vec(),
    })
}

fn compose(header: VersionNegotiationHeader) -> Result<Bytes, WireError> {
    let mut buf = BytesMut::with_capacity(1 + 4 + 1 + 36 + header.versions.len() * 4);
    Header::VersionNegotiation(header).write(&mut buf, Perspective::Server)?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_offer_is_recognized() {
        let cid = ConnectionId::from([1, 2, 3, 4, 5, 6, 7, 8]);
        let offer = [VersionNumber(77), VersionNumber::GQUIC_39];
        let packet = compose_legacy_version_negotiation(&cid, &offer).unwrap();

        let (header, len) =
            Header::parse(&packet, Perspective::Server, VersionNumber::GQUIC_43).unwrap();
        assert_eq!(len, packet.len());
        let Header::VersionNegotiation(vn) = header else {
            panic!("expected version negotiation, got {header:?}");
        };
        assert_eq!(vn.form, HeaderForm::Public);
        assert_eq!(vn.versions, offer);
        assert_eq!(vn.dest_connection_id, Some(cid));
    }

    #[test]
    fn long_offer_is_recognized_under_any_version() {
        let dest = ConnectionId::from([1, 2, 3, 4, 5, 6, 7, 8]);
        let src = ConnectionId::from([8, 7, 6, 5, 4, 3, 2, 1]);
        let packet = compose_version_negotiation(&dest, &src, &[VersionNumber(1234)]).unwrap();

        for current in [VersionNumber::GQUIC_39, VersionNumber::TLS] {
            let (header, _) = Header::parse(&packet, Perspective::Server, current).unwrap();
            assert!(header.is_version_negotiation());
            assert!(header.is_long_header());
            assert_eq!(header.destination_connection_id(), Some(&dest));
        }
    }

    #[test]
    fn empty_offer_cannot_be_composed() {
        let cid = ConnectionId::from([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            compose_legacy_version_negotiation(&cid, &[]).unwrap_err(),
            WireError::EmptyVersionList
        );
    }
}
