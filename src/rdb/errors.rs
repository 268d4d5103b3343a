use std::io;

/// A fatal error while decoding an RDB stream. The decoder produces nothing after one of these.
#[derive(Debug, thiserror::Error)]
#[error("{kind} (while parsing record beginning at offset {offset})")]
pub struct DecodeError {
    /// Byte offset of the start of the record that failed
    pub offset: u64,
    pub kind: DecodeErrorKind,
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError {
            offset: 0,
            kind: DecodeErrorKind::Io(err),
        }
    }
}

/// What went wrong while decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("Not a Redis RDB: {0}")]
    MalformedHeader(&'static str),
    #[error("Checksum didn't match, possible file corruption (expected {expected:02X?}, found {found:02X?})")]
    ChecksumMismatch { expected: [u8; 8], found: [u8; 8] },
    #[error("Corrupt zipmap: {0}")]
    CorruptZipMap(&'static str),
    #[error("Corrupt ziplist: {0}")]
    CorruptZipList(&'static str),
    #[error("Corrupt intset: {0}")]
    CorruptIntSet(&'static str),
    #[error("Unexpected intset width {0}")]
    UnexpectedIntSetWidth(u32),
    #[error("Unknown string encoding {0}")]
    UnknownEncoding(u8),
    #[error("Unknown value type {0}")]
    UnknownValueType(u8),
    #[error("Unexpected special encoding in {0}")]
    UnexpectedSpecialEncoding(&'static str),
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(&'static str),
    #[error("Failed to decompress string: {0}")]
    Decompression(String),
    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolViolation),
    #[error("Stream ended after {offset} bytes in the middle of a record")]
    Truncated { offset: u64 },
    #[error("{0} unexpected bytes after the checksum")]
    TrailingBytes(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Misuse of the byte assembler
#[derive(Debug, thiserror::Error)]
#[error("Byte request protocol violated: {0}")]
pub struct ProtocolViolation(pub &'static str);

/// Errors while encoding records into an RDB stream
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Unexpected record received: {found}; was expecting one of: {expected:?}")]
    SequenceViolation {
        found: &'static str,
        expected: &'static [&'static str],
    },
    #[error("Value {0} too large to encode")]
    EncodingOverflow(u64),
    #[error(transparent)]
    Io(#[from] io::Error),
}
