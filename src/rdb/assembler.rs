//! Incremental byte assembly
//!
//! The decoder asks for "the next `n` bytes, then continue with `K`". Input arrives in chunks
//! of any size, so a request may be satisfied by a slice of one chunk or by several chunks
//! glued together. Only one request is outstanding at a time, and the continuation is plain
//! data handed back to the caller's loop rather than a callback, so long chains of requests
//! never deepen the call stack.

use bytes::{Bytes, BytesMut};

use super::{crc::Crc64, errors::ProtocolViolation};

/// A pending request for bytes
#[derive(Debug)]
struct Request<K> {
    len: usize,
    cont: K,
    /// Whether the bytes count towards the running checksum
    checksummed: bool,
}

/// Accumulates input bytes until the outstanding request can be satisfied
#[derive(Debug)]
pub struct ByteAssembler<K> {
    pending: Option<Request<K>>,
    /// Bytes collected so far for the pending request
    parts: BytesMut,
    /// Total bytes handed out so far
    offset: u64,
    crc: Crc64,
}

impl<K> Default for ByteAssembler<K> {
    fn default() -> Self {
        Self {
            pending: None,
            parts: BytesMut::new(),
            offset: 0,
            crc: Crc64::new(),
        }
    }
}

impl<K> ByteAssembler<K> {
    /// Request the next `len` bytes, to be delivered together with `cont`
    pub fn request(&mut self, len: usize, cont: K) -> Result<(), ProtocolViolation> {
        self.push_request(len, cont, true)
    }

    /// Request the next `len` bytes without adding them to the running checksum
    pub fn request_unchecked(&mut self, len: usize, cont: K) -> Result<(), ProtocolViolation> {
        self.push_request(len, cont, false)
    }

    fn push_request(
        &mut self,
        len: usize,
        cont: K,
        checksummed: bool,
    ) -> Result<(), ProtocolViolation> {
        if self.pending.is_some() {
            return Err(ProtocolViolation("there is already a pending request"));
        }
        if len == 0 {
            return Err(ProtocolViolation("can only request a positive number of bytes"));
        }
        self.pending = Some(Request {
            len,
            cont,
            checksummed,
        });
        Ok(())
    }

    /// Take bytes from `src` towards the pending request. Returns the continuation and the
    /// assembled buffer once the request is complete, leaving any extra bytes in `src`.
    pub fn poll(&mut self, src: &mut BytesMut) -> Option<(K, Bytes)> {
        let wanted = self.pending.as_ref()?.len - self.parts.len();
        if src.len() < wanted {
            self.parts.extend_from_slice(&src.split());
            return None;
        }

        let buf = if self.parts.is_empty() {
            src.split_to(wanted).freeze()
        } else {
            self.parts.extend_from_slice(&src.split_to(wanted));
            self.parts.split().freeze()
        };
        let request = self.pending.take()?;
        self.offset += request.len as u64;
        if request.checksummed {
            self.crc.push(&buf);
        }

        Some((request.cont, buf))
    }

    /// Number of bytes delivered to continuations so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes held back for the pending request
    pub fn buffered(&self) -> usize {
        self.parts.len()
    }

    /// The running checksum over every checksummed byte delivered so far
    pub fn checksum(&self) -> [u8; 8] {
        self.crc.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_chunk() {
        let mut assembler = ByteAssembler::default();
        let mut src = BytesMut::from(&b"hello world"[..]);

        assembler.request(5, 'a').unwrap();
        let (cont, buf) = assembler.poll(&mut src).unwrap();
        assert_eq!((cont, &buf[..]), ('a', &b"hello"[..]));
        assert_eq!(&src[..], b" world");
        assert_eq!(assembler.offset(), 5);
    }

    #[test]
    fn spans_chunks() {
        let mut assembler = ByteAssembler::default();
        assembler.request(6, ()).unwrap();

        let mut src = BytesMut::from(&b"ab"[..]);
        assert!(assembler.poll(&mut src).is_none());
        assert!(src.is_empty());
        assert_eq!(assembler.buffered(), 2);

        let mut src = BytesMut::from(&b"cd"[..]);
        assert!(assembler.poll(&mut src).is_none());

        let mut src = BytesMut::from(&b"efgh"[..]);
        let ((), buf) = assembler.poll(&mut src).unwrap();
        assert_eq!(&buf[..], b"abcdef");
        assert_eq!(&src[..], b"gh");
        assert_eq!(assembler.buffered(), 0);
        assert!(assembler.request(1, ()).is_ok(), "request completed");
    }

    #[test]
    fn nothing_pending() {
        let mut assembler: ByteAssembler<()> = ByteAssembler::default();
        let mut src = BytesMut::from(&b"abc"[..]);
        assert!(assembler.poll(&mut src).is_none());
        assert_eq!(src.len(), 3, "input left untouched");
    }

    #[test]
    fn one_request_at_a_time() {
        let mut assembler = ByteAssembler::default();
        assembler.request(1, 1).unwrap();
        assert!(assembler.request(1, 2).is_err());
        assert!(assembler.request_unchecked(1, 2).is_err());
    }

    #[test]
    fn zero_length_request() {
        let mut assembler = ByteAssembler::default();
        assert!(assembler.request(0, ()).is_err());
        assert!(assembler.request(1, ()).is_ok());
    }

    #[test]
    fn checksum_skips_unchecked_bytes() {
        let mut assembler = ByteAssembler::default();
        let mut src = BytesMut::from(&b"123456789XXXXXXXX"[..]);

        assembler.request(9, ()).unwrap();
        assembler.poll(&mut src).unwrap();
        let before = assembler.checksum();

        assembler.request_unchecked(8, ()).unwrap();
        let ((), buf) = assembler.poll(&mut src).unwrap();
        assert_eq!(&buf[..], b"XXXXXXXX");
        assert_eq!(assembler.checksum(), before);
        assert_eq!(before, [0xCA, 0xD9, 0xB8, 0xC4, 0x14, 0xD9, 0xC6, 0xE9]);
        assert_eq!(assembler.offset(), 17);
    }

    #[test]
    fn checksum_is_independent_of_chunking() {
        let mut assembler = ByteAssembler::default();
        assembler.request(9, ()).unwrap();
        for byte in b"12345678" {
            let mut src = BytesMut::from(&[*byte][..]);
            assert!(assembler.poll(&mut src).is_none());
        }
        let mut src = BytesMut::from(&b"9"[..]);
        assembler.poll(&mut src).unwrap();
        assert_eq!(
            assembler.checksum(),
            [0xCA, 0xD9, 0xB8, 0xC4, 0x14, 0xD9, 0xC6, 0xE9]
        );
    }
}
