use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use super::{
    config::EncoderConfig,
    constants,
    errors::EncodeError,
    length::{self, write_length},
    Checksum, Crc64, KeyEntry, Record, Value,
};

/// Which records the encoder accepts next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Header,
    DatabaseOrEnd,
    DatabaseKeyOrEnd,
    Crc,
    Done,
}

impl Expect {
    fn allowed(self) -> &'static [&'static str] {
        match self {
            Expect::Header => &["header"],
            Expect::DatabaseOrEnd => &["database", "end"],
            Expect::DatabaseKeyOrEnd => &["database", "key", "end"],
            Expect::Crc => &["crc"],
            Expect::Done => &[],
        }
    }

    /// State after accepting `record`, or `None` if it isn't allowed here
    fn after(self, record: &Record) -> Option<Expect> {
        match (self, record) {
            (Expect::Header, Record::Header { .. }) => Some(Expect::DatabaseOrEnd),
            (
                Expect::DatabaseOrEnd | Expect::DatabaseKeyOrEnd,
                Record::DatabaseSelector { .. },
            ) => Some(Expect::DatabaseKeyOrEnd),
            (Expect::DatabaseKeyOrEnd, Record::Key(_)) => Some(Expect::DatabaseKeyOrEnd),
            (Expect::DatabaseOrEnd | Expect::DatabaseKeyOrEnd, Record::End) => Some(Expect::Crc),
            (Expect::Crc, Record::Checksum(_)) => Some(Expect::Done),
            _ => None,
        }
    }
}

/// RDB encoder that works as a tokio encoder. Records must arrive in the same order the
/// decoder produces them.
#[derive(Debug)]
pub struct RdbEncoder {
    config: EncoderConfig,
    expect: Expect,
    /// Currently selected database
    database: Option<u32>,
    crc: Crc64,
    /// Bytes of the record being encoded
    record: BytesMut,
}

impl Default for RdbEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}

impl Encoder<Record> for RdbEncoder {
    type Error = EncodeError;

    fn encode(&mut self, item: Record, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Some(next) = self.expect.after(&item) else {
            return Err(EncodeError::SequenceViolation {
                found: item.kind(),
                expected: self.expect.allowed(),
            });
        };

        self.record.clear();
        match &item {
            Record::Header { version } => self.write_header(*version)?,
            Record::DatabaseSelector { number } => self.write_database(*number)?,
            Record::Key(entry) => self.write_key(entry)?,
            Record::End => self.record.put_u8(constants::END_FILE_FLAG),
            Record::Checksum(checksum) => {
                let value = match checksum {
                    Checksum::Verified => self.crc.value(),
                    Checksum::Disabled => [0; constants::CHECKSUM_LEN],
                };
                debug!("Writing RDB checksum {value:02X?}");
                self.record.put_slice(&value);
            }
        }

        // The checksum covers everything before it, but not itself
        if !matches!(item, Record::Checksum(_)) {
            self.crc.push(&self.record);
        }
        dst.extend_from_slice(&self.record);
        self.expect = next;
        // A failed record leaves the selected database alone
        match &item {
            Record::DatabaseSelector { number } => self.database = Some(*number),
            Record::Key(entry) => self.database = Some(entry.database),
            _ => {}
        }
        trace!("Encoded {} record ({} bytes)", item.kind(), self.record.len());

        Ok(())
    }
}

impl RdbEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            expect: Expect::Header,
            database: None,
            crc: Crc64::new(),
            record: BytesMut::new(),
        }
    }

    fn write_header(&mut self, version: u16) -> Result<(), EncodeError> {
        if version > 9999 {
            return Err(EncodeError::EncodingOverflow(version.into()));
        }
        self.record.put_slice(constants::MAGIC);
        self.record.put_slice(format!("{version:04}").as_bytes());
        Ok(())
    }

    fn write_database(&mut self, number: u32) -> Result<(), EncodeError> {
        debug!("Selecting database {number}");
        self.record.put_u8(constants::DB_FLAG);
        write_length(&mut self.record, number.into())
    }

    fn write_key(&mut self, entry: &KeyEntry) -> Result<(), EncodeError> {
        if self.database != Some(entry.database) {
            self.write_database(entry.database)?;
        }
        if let Some(expiry) = entry.expiry {
            self.record.put_u8(constants::EXPIRY_U64_FLAG);
            self.record.put_i64_le(expiry);
        }

        match &entry.value {
            Value::Str(value) => {
                self.record.put_u8(constants::TYPE_STRING_FLAG);
                self.write_string(&entry.key)?;
                self.write_string(value)?;
            }
            Value::List(items) | Value::Set(items) => {
                let flag = match entry.value {
                    Value::List(_) => constants::TYPE_LIST_FLAG,
                    _ => constants::TYPE_SET_FLAG,
                };
                self.record.put_u8(flag);
                self.write_string(&entry.key)?;
                write_length(&mut self.record, items.len() as u64)?;
                for item in items {
                    self.write_string(item)?;
                }
            }
            Value::Hash(pairs) => {
                self.record.put_u8(constants::TYPE_HASH_FLAG);
                self.write_string(&entry.key)?;
                write_length(&mut self.record, pairs.len() as u64)?;
                for (field, value) in pairs {
                    self.write_string(field)?;
                    self.write_string(value)?;
                }
            }
            Value::SortedSet(pairs) => {
                self.record.put_u8(constants::TYPE_ZSET_FLAG);
                self.write_string(&entry.key)?;
                write_length(&mut self.record, pairs.len() as u64)?;
                for (member, score) in pairs {
                    self.write_string(member)?;
                    self.write_score(score)?;
                }
            }
        }
        Ok(())
    }

    /// Write a string in the most compact form available: a special integer encoding, LZF
    /// compressed, or length-prefixed as is
    fn write_string(&mut self, val: &[u8]) -> Result<(), EncodeError> {
        if let Some(int) = length::canonical_int(val) {
            if length::write_string_int(&mut self.record, int) {
                return Ok(());
            }
        }

        if self.config.compress && val.len() > self.config.compression_threshold {
            if let Ok(compressed) = lzf::compress(val) {
                if compressed.len() < val.len() {
                    self.record.put_u8(constants::STRING_LZF_FLAG);
                    write_length(&mut self.record, compressed.len() as u64)?;
                    write_length(&mut self.record, val.len() as u64)?;
                    self.record.put_slice(&compressed);
                    return Ok(());
                }
            }
        }

        write_length(&mut self.record, val.len() as u64)?;
        self.record.put_slice(val);
        Ok(())
    }

    /// Sorted set scores have their own length byte, with a few reserved for special values
    fn write_score(&mut self, score: &[u8]) -> Result<(), EncodeError> {
        match score {
            b"nan" => self.record.put_u8(constants::SCORE_NAN),
            b"inf" => self.record.put_u8(constants::SCORE_POS_INF),
            b"-inf" => self.record.put_u8(constants::SCORE_NEG_INF),
            score if score.len() >= constants::SCORE_NAN as usize => {
                return Err(EncodeError::EncodingOverflow(score.len() as u64));
            }
            score => {
                self.record.put_u8(score.len() as u8);
                self.record.put_slice(score);
            }
        }
        Ok(())
    }
}
