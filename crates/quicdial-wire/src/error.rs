//! Header codec errors.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of packet while reading {0}")]
    UnexpectedEnd(&'static str),

    #[error("invalid public flags {0:#04x}")]
    InvalidPublicFlags(u8),

    #[error("invalid short header flags {0:#04x}")]
    InvalidShortHeaderFlags(u8),

    #[error("unknown long header packet type {0:#04x}")]
    UnknownLongPacketType(u8),

    #[error("invalid connection ID length {0}")]
    InvalidConnectionIdLength(usize),

    #[error("version negotiation packet lists no versions")]
    EmptyVersionList,

    #[error("version list of {0} bytes is not a multiple of 4")]
    MalformedVersionList(usize),

    #[error("value {0} does not fit in a variable-length integer")]
    VarIntTooLarge(u64),

    #[error("packet number {number} does not fit in {len} bytes")]
    PacketNumberTooLarge { number: u64, len: usize },

    #[error("public reset has tag {0:?}, expected PRST")]
    InvalidResetTag([u8; 4]),
}
