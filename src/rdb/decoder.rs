use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};

use super::{
    assembler::ByteAssembler,
    config::DecoderConfig,
    constants,
    errors::{DecodeError, DecodeErrorKind, ProtocolViolation},
    length::{self, Length},
    packed, Checksum, KeyEntry, Record, Value, ValueType,
};

type DecodeResult = Result<Option<Record>, DecodeErrorKind>;

/// Upper bound on up-front allocation for a collection, whatever count the file claims
const PREALLOCATE_MAX: u64 = 1024;

/// What to do with the next requested bytes
#[derive(Debug)]
enum Next {
    Magic,
    RecordType,
    /// 4 byte expiry and the value type flag
    ExpirySeconds,
    /// 8 byte expiry and the value type flag
    ExpiryMillis,
    Checksum([u8; 8]),
    LengthHead(LengthOf),
    LengthTail14 { high: u8, of: LengthOf },
    LengthTail32(LengthOf),
    StringBody(StringOf),
    IntString(StringOf),
    Compressed { uncompressed_len: usize, of: StringOf },
    /// Sorted set score as Redis writes it: one length byte, 253/254/255 for nan/inf/-inf
    ScoreLen,
    ScoreBody,
}

/// What a length being read is for
#[derive(Debug, Clone, Copy)]
enum LengthOf {
    Database,
    Collection,
    String(StringOf),
    CompressedLen(StringOf),
    UncompressedLen { compressed_len: u32, of: StringOf },
}

/// What a string being read is for
#[derive(Debug, Clone, Copy)]
enum StringOf {
    Key,
    Element,
}

/// A key whose value is still being read
#[derive(Debug)]
struct PartialEntry {
    expiry: Option<i64>,
    value_type: ValueType,
    key: Bytes,
    /// Number of strings that make up the value
    expected: u64,
    strings: Vec<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Running,
    Finished,
    Failed,
}

/// Streaming RDB decoder that works as a tokio decoder.
///
/// Bytes can arrive in chunks of any size. Each call to `decode` consumes all the input it's
/// given, keeping a partial record in its own buffer, and returns at most one record.
#[derive(Debug)]
pub struct RdbDecoder {
    config: DecoderConfig,
    input: ByteAssembler<Next>,
    /// Currently selected database
    database: u32,
    /// Offset of the record being parsed
    record_start: u64,
    entry: Option<PartialEntry>,
    phase: Phase,
}

impl Default for RdbDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl Decoder for RdbDecoder {
    type Item = Record;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decode_next(src).map_err(|kind| {
            self.phase = Phase::Failed;
            DecodeError {
                offset: self.record_start,
                kind,
            }
        })
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if self.phase == Phase::Running => {
                self.phase = Phase::Failed;
                Err(DecodeError {
                    offset: self.record_start,
                    kind: DecodeErrorKind::Truncated {
                        offset: self.input.offset() + self.input.buffered() as u64,
                    },
                })
            }
            None => Ok(None),
        }
    }
}

impl RdbDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            input: ByteAssembler::default(),
            database: 0,
            record_start: 0,
            entry: None,
            phase: Phase::Start,
        }
    }

    /// Currently selected database
    pub fn database(&self) -> u32 {
        self.database
    }

    /// Offset of the start of the record currently being parsed
    pub fn record_start(&self) -> u64 {
        self.record_start
    }

    /// Total bytes of complete requests consumed so far
    pub fn offset(&self) -> u64 {
        self.input.offset()
    }

    fn decode_next(&mut self, src: &mut BytesMut) -> DecodeResult {
        match self.phase {
            Phase::Start => {
                self.input.request(constants::HEADER_LEN, Next::Magic)?;
                self.phase = Phase::Running;
            }
            Phase::Running => {}
            Phase::Finished if src.is_empty() => return Ok(None),
            Phase::Finished => return Err(DecodeErrorKind::TrailingBytes(src.len())),
            Phase::Failed => {
                src.clear();
                return Ok(None);
            }
        }

        // Each step issues the next request before returning, so this loop drives the whole
        // grammar without recursion
        while let Some((next, buf)) = self.input.poll(src) {
            if let Some(record) = self.step(next, buf)? {
                trace!("Decoded {} record", record.kind());
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn step(&mut self, next: Next, mut buf: Bytes) -> DecodeResult {
        match next {
            Next::Magic => self.on_magic(&buf),
            Next::RecordType => self.on_record_type(buf[0]),
            Next::ExpirySeconds => {
                let expiry = buf.get_i32_le() as i64 * 1000;
                self.on_key_start(Some(expiry), buf.get_u8())
            }
            Next::ExpiryMillis => {
                let expiry = buf.get_i64_le();
                self.on_key_start(Some(expiry), buf.get_u8())
            }
            Next::Checksum(expected) => self.on_checksum(expected, &buf),
            Next::LengthHead(of) => {
                let first_byte = buf[0];
                let low_bits = length::low_bits(first_byte);
                match length::length_flag(first_byte) {
                    constants::LEN_6BIT => self.on_length(of, Length::Plain(low_bits.into())),
                    constants::LEN_14BIT => {
                        let next = Next::LengthTail14 { high: low_bits, of };
                        self.input.request(1, next)?;
                        Ok(None)
                    }
                    constants::LEN_32BIT => {
                        self.input.request(4, Next::LengthTail32(of))?;
                        Ok(None)
                    }
                    _ => self.on_length(of, Length::Special(low_bits)),
                }
            }
            Next::LengthTail14 { high, of } => {
                let len = u16::from_be_bytes([high, buf[0]]);
                self.on_length(of, Length::Plain(len.into()))
            }
            Next::LengthTail32(of) => self.on_length(of, Length::Plain(buf.get_u32())),
            Next::StringBody(of) => self.on_string(of, buf),
            Next::IntString(of) => {
                let int = match buf.len() {
                    1 => buf.get_i8() as i64,
                    2 => buf.get_i16_le() as i64,
                    _ => buf.get_i32_le() as i64,
                };
                self.on_string(of, Bytes::from(int.to_string()))
            }
            Next::Compressed {
                uncompressed_len,
                of,
            } => {
                let raw = lzf::decompress(&buf, uncompressed_len)
                    .map_err(|err| DecodeErrorKind::Decompression(format!("{err:?}")))?;
                if raw.len() != uncompressed_len {
                    return Err(DecodeErrorKind::Decompression(format!(
                        "expected {uncompressed_len} bytes, got {}",
                        raw.len()
                    )));
                }
                self.on_string(of, Bytes::from(raw))
            }
            Next::ScoreLen => match buf[0] {
                constants::SCORE_NAN => self.on_string(StringOf::Element, Bytes::from_static(b"nan")),
                constants::SCORE_POS_INF => {
                    self.on_string(StringOf::Element, Bytes::from_static(b"inf"))
                }
                constants::SCORE_NEG_INF => {
                    self.on_string(StringOf::Element, Bytes::from_static(b"-inf"))
                }
                0 => self.on_string(StringOf::Element, Bytes::new()),
                len => {
                    self.input.request(len.into(), Next::ScoreBody)?;
                    Ok(None)
                }
            },
            Next::ScoreBody => self.on_string(StringOf::Element, buf),
        }
    }

    fn on_magic(&mut self, buf: &[u8]) -> DecodeResult {
        let (magic, version) = buf.split_at(constants::MAGIC.len());
        if magic != constants::MAGIC {
            return Err(DecodeErrorKind::MalformedHeader("invalid magic header"));
        }
        let version: u16 = Some(version)
            .filter(|v| v.iter().all(u8::is_ascii_digit))
            .and_then(|v| std::str::from_utf8(v).ok())
            .and_then(|v| v.parse().ok())
            .ok_or(DecodeErrorKind::MalformedHeader("invalid version number"))?;
        debug!("RDB file version {version}");

        self.next_record()?;
        Ok(Some(Record::Header { version }))
    }

    fn on_record_type(&mut self, flag: u8) -> DecodeResult {
        match flag {
            constants::END_FILE_FLAG => {
                // Capture the checksum now, so reading the stored one doesn't affect it
                let expected = self.input.checksum();
                let next = Next::Checksum(expected);
                self.input
                    .request_unchecked(constants::CHECKSUM_LEN, next)?;
                Ok(Some(Record::End))
            }
            constants::DB_FLAG => self.read_length(LengthOf::Database),
            constants::EXPIRY_U32_FLAG => {
                self.input.request(4 + 1, Next::ExpirySeconds)?;
                Ok(None)
            }
            constants::EXPIRY_U64_FLAG => {
                self.input.request(8 + 1, Next::ExpiryMillis)?;
                Ok(None)
            }
            type_flag => self.on_key_start(None, type_flag),
        }
    }

    fn on_checksum(&mut self, expected: [u8; 8], stored: &[u8]) -> DecodeResult {
        // Redis writes zeros when checksums are turned off
        let checksum = if stored.iter().all(|b| *b == 0) {
            warn!("RDB checksum is disabled, contents were not verified");
            Checksum::Disabled
        } else if stored == &expected[..] {
            debug!("RDB checksum verified");
            Checksum::Verified
        } else {
            let mut found = [0; constants::CHECKSUM_LEN];
            found.copy_from_slice(stored);
            return Err(DecodeErrorKind::ChecksumMismatch { expected, found });
        };

        self.phase = Phase::Finished;
        self.record_start = self.input.offset();
        Ok(Some(Record::Checksum(checksum)))
    }

    fn on_key_start(&mut self, expiry: Option<i64>, type_flag: u8) -> DecodeResult {
        let value_type = ValueType::try_from(type_flag)?;
        if value_type == ValueType::SortedSet && !self.config.decode_sorted_sets {
            return Err(DecodeErrorKind::UnsupportedEncoding("uncompressed sorted set"));
        }

        self.entry = Some(PartialEntry {
            expiry,
            value_type,
            key: Bytes::new(),
            expected: 1,
            strings: Vec::new(),
        });
        self.read_string(StringOf::Key)
    }

    fn on_length(&mut self, of: LengthOf, len: Length) -> DecodeResult {
        match (of, len) {
            (LengthOf::Database, Length::Plain(number)) => {
                self.database = number;
                self.next_record()?;
                Ok(Some(Record::DatabaseSelector { number }))
            }
            (LengthOf::Database, Length::Special(_)) => Err(
                DecodeErrorKind::UnexpectedSpecialEncoding("database record"),
            ),

            (LengthOf::Collection, Length::Plain(count)) => {
                let entry = self.entry_mut()?;
                let per_entry = entry.value_type.strings_per_entry().unwrap_or(1);
                entry.expected = count as u64 * per_entry;
                entry
                    .strings
                    .reserve(entry.expected.min(PREALLOCATE_MAX) as usize);
                self.next_element()
            }
            (LengthOf::Collection, Length::Special(_)) => Err(
                DecodeErrorKind::UnexpectedSpecialEncoding("list, set, sorted set or hash"),
            ),

            (LengthOf::String(of), Length::Plain(0)) => self.on_string(of, Bytes::new()),
            (LengthOf::String(of), Length::Plain(len)) => {
                self.input.request(len as usize, Next::StringBody(of))?;
                Ok(None)
            }
            (LengthOf::String(of), Length::Special(encoding)) => {
                let width = match encoding {
                    constants::ENC_INT8 => 1,
                    constants::ENC_INT16 => 2,
                    constants::ENC_INT32 => 4,
                    constants::ENC_LZF => return self.read_length(LengthOf::CompressedLen(of)),
                    encoding => return Err(DecodeErrorKind::UnknownEncoding(encoding)),
                };
                self.input.request(width, Next::IntString(of))?;
                Ok(None)
            }

            (LengthOf::CompressedLen(of), Length::Plain(compressed_len)) => {
                self.read_length(LengthOf::UncompressedLen { compressed_len, of })
            }
            (LengthOf::UncompressedLen { compressed_len: 0, of }, Length::Plain(0)) => {
                self.on_string(of, Bytes::new())
            }
            (LengthOf::UncompressedLen { compressed_len: 0, .. }, Length::Plain(_)) => Err(
                DecodeErrorKind::Decompression("no compressed data".to_string()),
            ),
            (
                LengthOf::UncompressedLen { compressed_len, of },
                Length::Plain(uncompressed_len),
            ) => {
                let next = Next::Compressed {
                    uncompressed_len: uncompressed_len as usize,
                    of,
                };
                self.input.request(compressed_len as usize, next)?;
                Ok(None)
            }
            (LengthOf::CompressedLen(_) | LengthOf::UncompressedLen { .. }, Length::Special(_)) => {
                Err(DecodeErrorKind::UnexpectedSpecialEncoding("compressed string"))
            }
        }
    }

    fn on_string(&mut self, of: StringOf, string: Bytes) -> DecodeResult {
        match of {
            StringOf::Key => {
                let entry = self.entry_mut()?;
                entry.key = string;
                if entry.value_type.strings_per_entry().is_some() {
                    self.read_length(LengthOf::Collection)
                } else {
                    self.read_string(StringOf::Element)
                }
            }
            StringOf::Element => {
                self.entry_mut()?.strings.push(string);
                self.next_element()
            }
        }
    }

    /// Request the next string of the value, or finish the key if there are none left
    fn next_element(&mut self) -> DecodeResult {
        let entry = self.entry_mut()?;
        let read = entry.strings.len() as u64;
        if read >= entry.expected {
            return self.finish_entry();
        }

        // sorted sets alternate between member strings and scores
        if entry.value_type == ValueType::SortedSet && read % 2 == 1 {
            self.input.request(1, Next::ScoreLen)?;
            return Ok(None);
        }
        self.read_string(StringOf::Element)
    }

    fn finish_entry(&mut self) -> DecodeResult {
        let entry = self
            .entry
            .take()
            .ok_or(ProtocolViolation("no key in progress"))?;
        let value = build_value(entry.value_type, entry.strings)?;
        let key = KeyEntry {
            database: self.database,
            key: entry.key,
            expiry: entry.expiry,
            value,
        };

        self.next_record()?;
        Ok(Some(Record::Key(key)))
    }

    fn entry_mut(&mut self) -> Result<&mut PartialEntry, ProtocolViolation> {
        self.entry
            .as_mut()
            .ok_or(ProtocolViolation("no key in progress"))
    }

    fn next_record(&mut self) -> Result<(), ProtocolViolation> {
        self.record_start = self.input.offset();
        self.input.request(1, Next::RecordType)
    }

    fn read_length(&mut self, of: LengthOf) -> DecodeResult {
        self.input.request(1, Next::LengthHead(of))?;
        Ok(None)
    }

    fn read_string(&mut self, of: StringOf) -> DecodeResult {
        self.read_length(LengthOf::String(of))
    }
}

/// Turn the strings read for a key into its value, unpacking single-string encodings
fn build_value(value_type: ValueType, strings: Vec<Bytes>) -> Result<Value, DecodeErrorKind> {
    fn single(strings: Vec<Bytes>) -> Bytes {
        strings.into_iter().next().unwrap_or_default()
    }

    Ok(match value_type {
        ValueType::String => Value::Str(single(strings)),
        ValueType::List => Value::List(strings),
        ValueType::Set => Value::Set(strings),
        ValueType::SortedSet => Value::SortedSet(packed::into_pairs(strings)?),
        ValueType::Hash => Value::Hash(packed::into_pairs(strings)?),
        ValueType::HashZipmap => Value::Hash(packed::parse_zipmap(&single(strings))?),
        ValueType::ListZiplist => Value::List(packed::parse_ziplist(&single(strings))?),
        ValueType::SetIntset => Value::Set(packed::parse_intset(&single(strings))?),
        ValueType::SortedSetZiplist => {
            Value::SortedSet(packed::into_pairs(packed::parse_ziplist(&single(strings))?)?)
        }
        ValueType::HashZiplist => {
            Value::Hash(packed::into_pairs(packed::parse_ziplist(&single(strings))?)?)
        }
    })
}
