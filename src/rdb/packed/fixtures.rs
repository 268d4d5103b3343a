//! Builders for packed encodings, the way Redis lays them out

use bytes::{BufMut, Bytes, BytesMut};

pub enum ZipEntry<'a> {
    Str(&'a [u8]),
    Int(i64),
}

pub fn ziplist(entries: &[ZipEntry]) -> Bytes {
    let mut body = BytesMut::new();
    let mut prev_len = 0usize;
    let mut tail = 0usize;
    for entry in entries {
        let start = body.len();
        tail = start;
        if prev_len < 254 {
            body.put_u8(prev_len as u8);
        } else {
            body.put_u8(254);
            body.put_u32_le(prev_len as u32);
        }

        match entry {
            ZipEntry::Str(s) if s.len() <= 0x3F => {
                body.put_u8(s.len() as u8);
                body.put_slice(s);
            }
            ZipEntry::Str(s) if s.len() <= 0x3FFF => {
                body.put_u16(0x4000 | s.len() as u16);
                body.put_slice(s);
            }
            ZipEntry::Str(s) => {
                body.put_u8(0x80);
                body.put_u32(s.len() as u32);
                body.put_slice(s);
            }
            ZipEntry::Int(int @ 0..=12) => body.put_u8(0xF1 + *int as u8),
            ZipEntry::Int(int) if i8::try_from(*int).is_ok() => {
                body.put_u8(0xFE);
                body.put_i8(*int as i8);
            }
            ZipEntry::Int(int) if i16::try_from(*int).is_ok() => {
                body.put_u8(0xC0);
                body.put_i16_le(*int as i16);
            }
            ZipEntry::Int(int) if (-0x80_0000..0x80_0000).contains(int) => {
                body.put_u8(0xF0);
                body.put_slice(&(*int as i32).to_le_bytes()[..3]);
            }
            ZipEntry::Int(int) if i32::try_from(*int).is_ok() => {
                body.put_u8(0xD0);
                body.put_i32_le(*int as i32);
            }
            ZipEntry::Int(int) => {
                body.put_u8(0xE0);
                body.put_i64_le(*int);
            }
        }
        prev_len = body.len() - start;
    }
    body.put_u8(0xFF);

    let mut buf = BytesMut::new();
    buf.put_u32_le((10 + body.len()) as u32);
    buf.put_u32_le((10 + tail) as u32);
    buf.put_u16_le(entries.len() as u16);
    buf.put_slice(&body);
    buf.freeze()
}

/// Values are followed by `free` unused bytes
pub fn zipmap(pairs: &[(&[u8], &[u8])], free: u8) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(pairs.len().min(254) as u8);
    for (key, value) in pairs {
        zipmap_len(&mut buf, key.len());
        buf.put_slice(key);
        zipmap_len(&mut buf, value.len());
        buf.put_u8(free);
        buf.put_slice(value);
        buf.put_bytes(0, free as usize);
    }
    buf.put_u8(0xFF);
    buf.freeze()
}

fn zipmap_len(buf: &mut BytesMut, len: usize) {
    if len < 253 {
        buf.put_u8(len as u8);
    } else {
        buf.put_u8(253);
        buf.put_u32_le(len as u32);
    }
}

pub fn intset(width: u32, values: &[i64]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u32_le(width);
    buf.put_u32_le(values.len() as u32);
    for value in values {
        match width {
            2 => buf.put_i16_le(*value as i16),
            4 => buf.put_i32_le(*value as i32),
            _ => buf.put_i64_le(*value),
        }
    }
    buf.freeze()
}
