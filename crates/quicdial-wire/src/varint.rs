//! Variable-length integers (two-bit length prefix, 1/2/4/8 bytes).
//!
//! Used for the payload length of long headers.

use bytes::{Buf, BufMut};

use crate::error::WireError;

/// Largest encodable value (2^62 - 1).
pub const MAX: u64 = (1u64 << 62) - 1;

/// Number of bytes `value` occupies once encoded.
pub fn size(value: u64) -> Result<usize, WireError> {
    match value {
        0..=0x3f => Ok(1),
        0x40..=0x3fff => Ok(2),
        0x4000..=0x3fff_ffff => Ok(4),
        0x4000_0000..=MAX => Ok(8),
        _ => Err(WireError::VarIntTooLarge(value)),
    }
}

/// Read one variable-length integer, advancing `buf`.
pub fn read(buf: &mut impl Buf) -> Result<u64, WireError> {
    if !buf.has_remaining() {
        return Err(WireError::UnexpectedEnd("varint"));
    }
    let first = buf.chunk()[0];
    let len = 1usize << (first >> 6);
    if buf.remaining() < len {
        return Err(WireError::UnexpectedEnd("varint"));
    }
    let mut value = u64::from(buf.get_u8() & 0x3f);
    for _ in 1..len {
        value = (value << 8) | u64::from(buf.get_u8());
    }
    Ok(value)
}

/// Append `value` using the shortest encoding.
pub fn write(buf: &mut impl BufMut, value: u64) -> Result<(), WireError> {
    match size(value)? {
        1 => buf.put_u8(u8::try_from(value).map_err(|_| WireError::VarIntTooLarge(value))?),
        2 => buf.put_u16(
            0x4000 | u16::try_from(value).map_err(|_| WireError::VarIntTooLarge(value))?,
        ),
        4 => buf.put_u32(
            0x8000_0000 | u32::try_from(value).map_err(|_| WireError::VarIntTooLarge(value))?,
        ),
        _ => buf.put_u64(0xc000_0000_0000_0000 | value),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_boundaries() {
        for (value, len) in [
            (0, 1),
            (63, 1),
            (64, 2),
            (16_383, 2),
            (16_384, 4),
            (1_073_741_823, 4),
            (1_073_741_824, 8),
            (MAX, 8),
        ] {
            let mut buf = Vec::new();
            write(&mut buf, value).unwrap();
            assert_eq!(buf.len(), len, "value {value}");
            assert_eq!(read(&mut buf.as_slice()).unwrap(), value);
        }
    }

    #[test]
    fn known_encoding() {
        // Two-byte example: 0x7bbd -> 15293.
        let mut data: &[u8] = &[0x7b, 0xbd];
        assert_eq!(read(&mut data).unwrap(), 15_293);
    }

    #[test]
    fn too_large() {
        assert_eq!(size(MAX + 1), Err(WireError::VarIntTooLarge(MAX + 1)));
        assert!(write(&mut Vec::new(), u64::MAX).is_err());
    }

    #[test]
    fn truncated_input() {
        let mut data: &[u8] = &[0x80, 0x01];
        assert_eq!(read(&mut data), Err(WireError::UnexpectedEnd("varint")));
        let mut empty: &[u8] = &[];
        assert!(read(&mut empty).is_err());
    }
}
