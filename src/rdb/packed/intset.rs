use std::io;

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;

use crate::rdb::errors::DecodeErrorKind;

/// Parse an intset: entry width, entry count, then the sorted little-endian integers
pub fn parse_intset(buf: &Bytes) -> Result<Vec<Bytes>, DecodeErrorKind> {
    let mut cur = &buf[..];
    let width = cur.read_u32::<LittleEndian>().map_err(truncated)?;
    let count = cur.read_u32::<LittleEndian>().map_err(truncated)?;
    if !matches!(width, 2 | 4 | 8) {
        return Err(DecodeErrorKind::UnexpectedIntSetWidth(width));
    }
    if cur.len() as u64 != width as u64 * count as u64 {
        return Err(DecodeErrorKind::CorruptIntSet("failed to occupy entire buffer"));
    }

    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let int = match width {
            2 => cur.read_i16::<LittleEndian>().map_err(truncated)? as i64,
            4 => cur.read_i32::<LittleEndian>().map_err(truncated)? as i64,
            _ => cur.read_i64::<LittleEndian>().map_err(truncated)?,
        };
        values.push(Bytes::from(int.to_string()));
    }

    Ok(values)
}

fn truncated(_: io::Error) -> DecodeErrorKind {
    DecodeErrorKind::CorruptIntSet("unexpected end of buffer")
}
