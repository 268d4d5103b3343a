//! Length encoding, and the integer-as-string encodings that share its special mode

use bytes::{BufMut, BytesMut};

use super::{constants, errors::EncodeError};

/// A decoded length prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// An ordinary length or count
    Plain(u32),
    /// Special encoding discriminator (low 6 bits)
    Special(u8),
}

/// Get the first 2 significant bits of a length value
pub fn length_flag(first_byte: u8) -> u8 {
    (first_byte & 0b11000000) >> 6
}

/// Get the last 6 bits of a length value
pub fn low_bits(first_byte: u8) -> u8 {
    first_byte & 0b00111111
}

/// Write a length using the smallest mode that fits
pub fn write_length(dst: &mut BytesMut, len: u64) -> Result<(), EncodeError> {
    match len {
        len if len <= 0x3F => dst.put_u8(len as u8),
        len if len <= 0x3FFF => write_u16_length(dst, len as u16),
        len if len <= u32::MAX as u64 => write_u32_length(dst, len as u32),
        invalid_len => return Err(EncodeError::EncodingOverflow(invalid_len)),
    }
    Ok(())
}

/// For lengths up to 16383 (0x3FFF)
fn write_u16_length(dst: &mut BytesMut, len: u16) {
    /// sets the 2nd significant bit to indicate a u16 length
    const BITMASK: u16 = 0x4000;
    dst.put_u16(len | BITMASK);
}

/// For lengths up to 2^32 - 1 (u32::MAX)
fn write_u32_length(dst: &mut BytesMut, len: u32) {
    /// Indicates that a u32 follows
    const FIRST_BYTE: u8 = 0x80;
    dst.put_u8(FIRST_BYTE);
    dst.put_u32(len);
}

/// Parse a string that is exactly the decimal rendering of an integer. Anything that wouldn't
/// render back to the same bytes (leading zeros, `+`, `-0`) is rejected.
pub fn canonical_int(val: &[u8]) -> Option<i64> {
    let digits = val.strip_prefix(b"-").unwrap_or(val);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let int: i64 = std::str::from_utf8(val).ok()?.parse().ok()?;
    (int.to_string().as_bytes() == val).then_some(int)
}

/// Write an integer string using the narrowest special encoding. Returns `false` without
/// writing anything if the value doesn't fit in 32 bits.
pub fn write_string_int(dst: &mut BytesMut, val: i64) -> bool {
    if let Ok(val) = i8::try_from(val) {
        dst.put_u8(constants::STRING_I8_FLAG);
        dst.put_i8(val);
    } else if let Ok(val) = i16::try_from(val) {
        dst.put_u8(constants::STRING_I16_FLAG);
        dst.put_i16_le(val);
    } else if let Ok(val) = i32::try_from(val) {
        dst.put_u8(constants::STRING_I32_FLAG);
        dst.put_i32_le(val);
    } else {
        return false;
    }
    true
}
