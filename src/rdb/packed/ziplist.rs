use std::io;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::Bytes;

use super::take;
use crate::rdb::errors::DecodeErrorKind;

/// Total bytes, tail offset, and entry count
const HEADER_LEN: usize = 4 + 4 + 2;
const END: u8 = 0xFF;
/// Previous entry length doesn't fit in one byte, a little-endian u32 follows
const PREV_LEN_U32: u8 = 254;

/// Parse a ziplist into its entries. Integer entries are rendered as decimal strings.
pub fn parse_ziplist(buf: &Bytes) -> Result<Vec<Bytes>, DecodeErrorKind> {
    let mut cur = &buf[..];
    let total_len = cur.read_u32::<LittleEndian>().map_err(truncated)?;
    let tail_offset = cur.read_u32::<LittleEndian>().map_err(truncated)?;
    let count = cur.read_u16::<LittleEndian>().map_err(truncated)?;
    if total_len as usize != buf.len() || buf.len() <= HEADER_LEN {
        return Err(corrupt("incorrect byte length"));
    }

    let mut values = Vec::with_capacity(count.into());
    let mut prev_entry_len = 0;
    for idx in 1..=count {
        let start = buf.len() - cur.len();
        if idx == count && tail_offset as usize != start {
            return Err(corrupt("incorrect tail offset"));
        }

        let prev_len = match cur.read_u8().map_err(truncated)? {
            PREV_LEN_U32 => cur.read_u32::<LittleEndian>().map_err(truncated)? as usize,
            END => return Err(corrupt("incorrect entry length encoding")),
            len => len as usize,
        };
        if prev_len != prev_entry_len {
            return Err(corrupt("entry length doesn't match the previous entry"));
        }

        values.push(read_entry(buf, &mut cur)?);
        prev_entry_len = buf.len() - cur.len() - start;
    }

    if cur.read_u8().map_err(truncated)? != END {
        return Err(corrupt("incorrectly terminated"));
    }
    if !cur.is_empty() {
        return Err(corrupt("failed to occupy whole buffer"));
    }

    Ok(values)
}

/// Read the encoding flag and content of one entry
fn read_entry(buf: &Bytes, cur: &mut &[u8]) -> Result<Bytes, DecodeErrorKind> {
    let flag = cur.read_u8().map_err(truncated)?;
    let str_len = match flag >> 6 {
        // 6 bit length
        0b00 => Some((flag & 0x3F) as usize),
        // 14 bit length: last 6 bits and next byte
        0b01 => {
            let low = cur.read_u8().map_err(truncated)?;
            Some(u16::from_be_bytes([flag & 0x3F, low]) as usize)
        }
        // 32 bit big-endian length
        0b10 => Some(cur.read_u32::<BigEndian>().map_err(truncated)? as usize),
        _ => None,
    };
    if let Some(len) = str_len {
        return take(buf, cur, len).ok_or_else(truncated_err);
    }

    let int = match flag {
        0xF0 => cur.read_i24::<LittleEndian>().map_err(truncated)? as i64,
        0xFE => cur.read_i8().map_err(truncated)? as i64,
        // value is embedded in the flag, offset by one
        0xF1..=0xFD => (flag & 0x0F) as i64 - 1,
        _ => match flag & 0xF0 {
            0xC0 => cur.read_i16::<LittleEndian>().map_err(truncated)? as i64,
            0xD0 => cur.read_i32::<LittleEndian>().map_err(truncated)? as i64,
            0xE0 => cur.read_i64::<LittleEndian>().map_err(truncated)?,
            _ => return Err(corrupt("unknown entry encoding")),
        },
    };
    Ok(Bytes::from(int.to_string()))
}

fn corrupt(reason: &'static str) -> DecodeErrorKind {
    DecodeErrorKind::CorruptZipList(reason)
}

fn truncated_err() -> DecodeErrorKind {
    corrupt("unexpected end of buffer")
}

fn truncated(_: io::Error) -> DecodeErrorKind {
    truncated_err()
}
