//! Public reset records.
//!
//! A public reset is a legacy packet with the reset flag set, followed by a
//! body of `PRST`, a nonce and the packet number the server rejected.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use quicdial_types::{ConnectionId, Perspective};

use crate::error::WireError;
use crate::header::{Header, PublicResetHeader};

/// Tag opening every public reset body.
pub const PUBLIC_RESET_TAG: [u8; 4] = *b"PRST";

const BODY_LEN: usize = 4 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicReset {
    pub nonce: u64,
    pub rejected_packet_number: u64,
}

impl PublicReset {
    /// Parse the body following a public reset header.
    pub fn parse(body: &[u8]) -> Result<Self, WireError> {
        let mut buf = body;
        if buf.remaining() < PUBLIC_RESET_TAG.len() {
            return Err(WireError::UnexpectedEnd("public reset tag"));
        }
        let mut tag = [0u8; 4];
        buf.copy_to_slice(&mut tag);
        if tag != PUBLIC_RESET_TAG {
            return Err(WireError::InvalidResetTag(tag));
        }
        if buf.remaining() < BODY_LEN - PUBLIC_RESET_TAG.len() {
            return Err(WireError::UnexpectedEnd("public reset body"));
        }
        let nonce = buf.get_u64();
        let rejected_packet_number = buf.get_u64();
        Ok(Self {
            nonce,
            rejected_packet_number,
        })
    }

    /// Build a complete public reset packet for `connection_id`.
    pub fn write(
        connection_id: &ConnectionId,
        rejected_packet_number: u64,
        nonce: u64,
    ) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::with_capacity(1 + connection_id.len() + BODY_LEN);
        Header::PublicReset(PublicResetHeader {
            connection_id: Some(connection_id.clone()),
        })
        .write(&mut buf, Perspective::Server)?;
        buf.put_slice(&PUBLIC_RESET_TAG);
        buf.put_u64(nonce);
        buf.put_u64(rejected_packet_number);
        Ok(buf.freeze())
    }
}
