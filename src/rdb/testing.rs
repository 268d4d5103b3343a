//! Helpers for building RDB byte streams and running them through the decoder

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use super::{
    constants, length::write_length, Crc64, DecodeError, DecoderConfig, RdbDecoder, Record,
};

/// Writes RDB bytes by hand, one piece at a time
pub struct RdbBuilder {
    buf: BytesMut,
}

impl RdbBuilder {
    pub fn new(version: u16) -> Self {
        let mut buf = BytesMut::new();
        buf.put_slice(constants::MAGIC);
        buf.put_slice(format!("{version:04}").as_bytes());
        Self { buf }
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn select(self, db: u32) -> Self {
        self.raw(&[constants::DB_FLAG]).length(db.into())
    }

    pub fn length(mut self, len: u64) -> Self {
        write_length(&mut self.buf, len).unwrap();
        self
    }

    /// A plain length-prefixed string
    pub fn string(self, string: &[u8]) -> Self {
        self.length(string.len() as u64).raw(string)
    }

    /// A type flag followed by the key
    pub fn key(self, type_flag: u8, key: &[u8]) -> Self {
        self.raw(&[type_flag]).string(key)
    }

    /// End marker and a correct checksum
    pub fn end(mut self) -> Bytes {
        self.buf.put_u8(constants::END_FILE_FLAG);
        let mut crc = Crc64::new();
        crc.push(&self.buf);
        self.buf.put_slice(&crc.value());
        self.buf.freeze()
    }

    /// End marker and an all-zero checksum
    pub fn end_unchecked(mut self) -> Bytes {
        self.buf.put_u8(constants::END_FILE_FLAG);
        self.buf.put_slice(&[0; constants::CHECKSUM_LEN]);
        self.buf.freeze()
    }

    /// Bytes written so far, without an end marker
    pub fn partial(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Decode a complete stream given as a single chunk
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Record>, DecodeError> {
    decode_chunks(DecoderConfig::default(), [bytes])
}

/// Decode a stream fed to the decoder in the given chunks
pub fn decode_chunks<'a>(
    config: DecoderConfig,
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> Result<Vec<Record>, DecodeError> {
    let mut decoder = RdbDecoder::new(config);
    let mut buf = BytesMut::new();
    let mut records = Vec::new();
    for chunk in chunks {
        buf.extend_from_slice(chunk);
        while let Some(record) = decoder.decode(&mut buf)? {
            records.push(record);
        }
    }
    while let Some(record) = decoder.decode_eof(&mut buf)? {
        records.push(record);
    }
    Ok(records)
}

/// Records between the header and the end marker
pub fn keys(records: Vec<Record>) -> Vec<super::KeyEntry> {
    records
        .into_iter()
        .filter_map(|record| match record {
            Record::Key(entry) => Some(entry),
            _ => None,
        })
        .collect()
}
