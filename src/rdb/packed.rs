//! Collections packed into a single string: zipmaps, ziplists and intsets. Every read is
//! bounds checked, and any inconsistency is reported as corruption of that format.

mod intset;
mod ziplist;
mod zipmap;

#[cfg(test)]
pub mod fixtures;

pub use intset::parse_intset;
pub use ziplist::parse_ziplist;
pub use zipmap::parse_zipmap;

use bytes::Bytes;

use super::errors::DecodeErrorKind;

/// Split off the next `len` bytes of `cur` (which must point into `buf`) without copying
fn take(buf: &Bytes, cur: &mut &[u8], len: usize) -> Option<Bytes> {
    if cur.len() < len {
        return None;
    }
    let start = buf.len() - cur.len();
    *cur = &cur[len..];
    Some(buf.slice(start..start + len))
}

/// Pair up a flat sequence of alternating keys and values
pub fn into_pairs(values: Vec<Bytes>) -> Result<Vec<(Bytes, Bytes)>, DecodeErrorKind> {
    if values.len() % 2 != 0 {
        return Err(DecodeErrorKind::CorruptZipList("odd number of entries for a map"));
    }
    let mut values = values.into_iter();
    let mut pairs = Vec::with_capacity(values.len() / 2);
    while let (Some(key), Some(value)) = (values.next(), values.next()) {
        pairs.push((key, value));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_slices() {
        let buf = Bytes::from_static(b"abcdef");
        let mut cur = &buf[1..];
        assert_eq!(take(&buf, &mut cur, 2), Some(Bytes::from_static(b"bc")));
        assert_eq!(cur, b"def");
        assert_eq!(take(&buf, &mut cur, 4), None);
        assert_eq!(take(&buf, &mut cur, 3), Some(Bytes::from_static(b"def")));
        assert!(cur.is_empty());
    }

    #[test]
    fn pairs() {
        let values = vec![Bytes::from("a"), Bytes::from("1"), Bytes::from("b"), Bytes::from("2")];
        assert_eq!(
            into_pairs(values).unwrap(),
            vec![
                (Bytes::from("a"), Bytes::from("1")),
                (Bytes::from("b"), Bytes::from("2"))
            ]
        );
        assert!(into_pairs(vec![Bytes::from("a")]).is_err());
    }
}
