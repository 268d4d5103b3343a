//! Streaming codec for the Redis RDB persistence format
//!
//! [`RdbDecoder`] turns bytes into [`Record`]s and [`RdbEncoder`] turns them back into bytes.
//! Both are tokio codecs, so they plug into `FramedRead` / `FramedWrite` over any async byte
//! source or sink.

mod assembler;
mod config;
mod constants;
mod crc;
mod decoder;
mod encoder;
mod errors;
mod length;
mod packed;

pub use config::{DecoderConfig, EncoderConfig};
pub use crc::Crc64;
pub use decoder::RdbDecoder;
pub use encoder::RdbEncoder;
pub use errors::{DecodeError, DecodeErrorKind, EncodeError, ProtocolViolation};

use bytes::Bytes;

/// One element of an RDB stream, in file order: a header, any number of database selectors
/// and keys, the end marker, then the checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Header { version: u16 },
    DatabaseSelector { number: u32 },
    Key(KeyEntry),
    End,
    Checksum(Checksum),
}

impl Record {
    /// Short name of the record type, used in errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Header { .. } => "header",
            Record::DatabaseSelector { .. } => "database",
            Record::Key(_) => "key",
            Record::End => "end",
            Record::Checksum(_) => "crc",
        }
    }
}

/// Outcome of the trailing checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// The stored checksum matched the bytes that preceded it
    Verified,
    /// The stored checksum was all zeros, i.e. checksums were turned off when the file was saved
    Disabled,
}

/// A persisted key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Database the key belongs to
    pub database: u32,
    pub key: Bytes,
    /// Expiry as Unix time in milliseconds
    pub expiry: Option<i64>,
    pub value: Value,
}

impl KeyEntry {
    pub fn rtype(&self) -> &'static str {
        self.value.rtype()
    }
}

/// The logical value of a key. Several wire encodings collapse into each shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(Bytes),
    List(Vec<Bytes>),
    Set(Vec<Bytes>),
    /// Field and value pairs, in file order
    Hash(Vec<(Bytes, Bytes)>),
    /// Member and score pairs, in file order. Scores are kept in their decimal string form.
    SortedSet(Vec<(Bytes, Bytes)>),
}

impl Value {
    pub fn rtype(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
            Value::SortedSet(_) => "zset",
        }
    }
}

/// How a value is laid out on the wire, as given by the type flag before the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    List,
    Set,
    SortedSet,
    Hash,
    HashZipmap,
    ListZiplist,
    SetIntset,
    SortedSetZiplist,
    HashZiplist,
}

impl TryFrom<u8> for ValueType {
    type Error = DecodeErrorKind;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        Ok(match flag {
            constants::TYPE_STRING_FLAG => ValueType::String,
            constants::TYPE_LIST_FLAG => ValueType::List,
            constants::TYPE_SET_FLAG => ValueType::Set,
            constants::TYPE_ZSET_FLAG => ValueType::SortedSet,
            constants::TYPE_HASH_FLAG => ValueType::Hash,
            constants::TYPE_HASH_ZIPMAP_FLAG => ValueType::HashZipmap,
            constants::TYPE_LIST_ZIPLIST_FLAG => ValueType::ListZiplist,
            constants::TYPE_SET_INTSET_FLAG => ValueType::SetIntset,
            constants::TYPE_ZSET_ZIPLIST_FLAG => ValueType::SortedSetZiplist,
            constants::TYPE_HASH_ZIPLIST_FLAG => ValueType::HashZiplist,
            flag => return Err(DecodeErrorKind::UnknownValueType(flag)),
        })
    }
}

impl ValueType {
    /// Number of byte strings per counted entry for types that are stored as a counted
    /// sequence, or `None` for types stored as a single string
    fn strings_per_entry(self) -> Option<u64> {
        match self {
            ValueType::List | ValueType::Set => Some(1),
            ValueType::SortedSet | ValueType::Hash => Some(2),
            ValueType::String
            | ValueType::HashZipmap
            | ValueType::ListZiplist
            | ValueType::SetIntset
            | ValueType::SortedSetZiplist
            | ValueType::HashZiplist => None,
        }
    }
}

#[cfg(test)]
mod testing;
