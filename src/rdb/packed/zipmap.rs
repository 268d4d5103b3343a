use std::io;

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;

use super::take;
use crate::rdb::errors::DecodeErrorKind;

const END: u8 = 0xFF;
/// Counts from here on aren't reliable, the map has to be read up to the end marker
const UNKNOWN_COUNT: u8 = 254;
/// String length doesn't fit in one byte, a u32 follows
const LEN_U32: u8 = 253;

/// Parse a zipmap into its field/value pairs
pub fn parse_zipmap(buf: &Bytes) -> Result<Vec<(Bytes, Bytes)>, DecodeErrorKind> {
    let mut cur = &buf[..];
    let count = cur.read_u8().map_err(truncated)?;

    let mut pairs = Vec::with_capacity(count.min(UNKNOWN_COUNT).into());
    if count >= UNKNOWN_COUNT {
        loop {
            match cur.first() {
                Some(&END) => {
                    cur = &cur[1..];
                    break;
                }
                Some(_) => pairs.push(read_pair(buf, &mut cur)?),
                None => return Err(corrupt("incorrectly terminated")),
            }
        }
    } else {
        for _ in 0..count {
            pairs.push(read_pair(buf, &mut cur)?);
        }
        if cur.read_u8().map_err(truncated)? != END {
            return Err(corrupt("incorrectly terminated"));
        }
    }

    if !cur.is_empty() {
        return Err(corrupt("failed to occupy entire buffer"));
    }
    Ok(pairs)
}

fn read_pair(buf: &Bytes, cur: &mut &[u8]) -> Result<(Bytes, Bytes), DecodeErrorKind> {
    let key = read_string(buf, cur, false)?;
    let value = read_string(buf, cur, true)?;
    Ok((key, value))
}

/// Read a length-prefixed string. Values (but not keys) have a byte giving the number of
/// unused bytes that follow the content.
fn read_string(buf: &Bytes, cur: &mut &[u8], has_free: bool) -> Result<Bytes, DecodeErrorKind> {
    let len = match cur.read_u8().map_err(truncated)? {
        LEN_U32 => cur.read_u32::<LittleEndian>().map_err(truncated)? as usize,
        254 | 255 => return Err(corrupt("incorrect string encoding")),
        len => len as usize,
    };
    let free = match has_free {
        true => cur.read_u8().map_err(truncated)? as usize,
        false => 0,
    };

    let value = take(buf, cur, len).ok_or_else(truncated_err)?;
    if cur.len() < free {
        return Err(truncated_err());
    }
    *cur = &cur[free..];

    Ok(value)
}

fn corrupt(reason: &'static str) -> DecodeErrorKind {
    DecodeErrorKind::CorruptZipMap(reason)
}

fn truncated_err() -> DecodeErrorKind {
    corrupt("unexpected end of buffer")
}

fn truncated(_: io::Error) -> DecodeErrorKind {
    truncated_err()
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    fn zipmap(pairs: &[(&str, &str)], free: u8) -> Bytes {
        let entries: Vec<(&[u8], &[u8])> = pairs
            .iter()
            .map(|(k, v)| (k.as_bytes(), v.as_bytes()))
            .collect();
        fixtures::zipmap(&entries, free)
    }

    fn pairs(pairs: &[(&str, &str)]) -> Vec<(Bytes, Bytes)> {
        pairs
            .iter()
            .map(|(k, v)| (Bytes::from(k.to_string()), Bytes::from(v.to_string())))
            .collect()
    }

    #[test]
    fn small() {
        let buf = zipmap(&[("a", "aa"), ("aa", "aaaa"), ("aaaaa", "aaaaaaaaaaaaaa")], 0);
        assert_eq!(
            parse_zipmap(&buf).unwrap(),
            pairs(&[("a", "aa"), ("aa", "aaaa"), ("aaaaa", "aaaaaaaaaaaaaa")])
        );
    }

    #[test]
    fn free_space_is_skipped() {
        let buf = zipmap(&[("MKD1G6", "2"), ("YNNXK", "F7TI")], 3);
        assert_eq!(
            parse_zipmap(&buf).unwrap(),
            pairs(&[("MKD1G6", "2"), ("YNNXK", "F7TI")])
        );
    }

    #[test]
    fn big_values() {
        let values: Vec<String> = [253, 254, 255, 300, 20_000]
            .iter()
            .map(|len| "v".repeat(*len))
            .collect();
        let entries: Vec<(&[u8], &[u8])> = values
            .iter()
            .map(|v| (v.as_bytes(), v.as_bytes()))
            .collect();
        let parsed = parse_zipmap(&fixtures::zipmap(&entries, 0)).unwrap();
        let lens: Vec<_> = parsed.iter().map(|(k, v)| (k.len(), v.len())).collect();
        assert_eq!(
            lens,
            [(253, 253), (254, 254), (255, 255), (300, 300), (20_000, 20_000)]
        );
    }

    #[test]
    fn unreliable_count() {
        let keys: Vec<String> = (0..300).map(|n| format!("k{n}")).collect();
        let entries: Vec<(&[u8], &[u8])> = keys
            .iter()
            .map(|k| (k.as_bytes(), b"v".as_slice()))
            .collect();
        let buf = fixtures::zipmap(&entries, 0);
        assert_eq!(buf[0], 254);
        let parsed = parse_zipmap(&buf).unwrap();
        assert_eq!(parsed.len(), 300);
        assert_eq!(parsed[299].0, "k299");
    }

    #[test]
    fn trailing_bytes() {
        let mut buf = zipmap(&[("a", "b")], 0).to_vec();
        buf.push(0);
        let err = parse_zipmap(&Bytes::from(buf)).unwrap_err();
        assert!(matches!(
            err,
            DecodeErrorKind::CorruptZipMap("failed to occupy entire buffer")
        ));
    }

    #[test]
    fn invalid_length() {
        let buf = Bytes::from_static(&[1, 254, 0, 0, 0xFF]);
        let err = parse_zipmap(&buf).unwrap_err();
        assert!(matches!(err, DecodeErrorKind::CorruptZipMap("incorrect string encoding")));
    }

    #[test]
    fn missing_terminator() {
        let mut buf = zipmap(&[("a", "b")], 0).to_vec();
        buf.pop();
        assert!(matches!(
            parse_zipmap(&Bytes::from(buf)).unwrap_err(),
            DecodeErrorKind::CorruptZipMap(_)
        ));
    }
}
