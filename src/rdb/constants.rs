pub const MAGIC: &[u8; 5] = b"REDIS";
/// `REDIS` followed by a 4 digit version
pub const HEADER_LEN: usize = MAGIC.len() + 4;
pub const CHECKSUM_LEN: usize = 8;

pub const DB_FLAG: u8 = 0xFE;
pub const END_FILE_FLAG: u8 = 0xFF;

/// Expiration in Unix time milliseconds (little endian)
pub const EXPIRY_U64_FLAG: u8 = 0xFC;
/// Expiration in Unix time seconds (little endian)
pub const EXPIRY_U32_FLAG: u8 = 0xFD;

// Length encoding modes (top 2 bits of the first byte). Anything else is a special encoding
pub const LEN_6BIT: u8 = 0b00;
pub const LEN_14BIT: u8 = 0b01;
pub const LEN_32BIT: u8 = 0b10;

// Special encodings (low 6 bits when the top 2 bits are both set)
pub const ENC_INT8: u8 = 0;
pub const ENC_INT16: u8 = 1;
pub const ENC_INT32: u8 = 2;
pub const ENC_LZF: u8 = 3;

pub const STRING_I8_FLAG: u8 = 0xC0;
pub const STRING_I16_FLAG: u8 = 0xC1;
pub const STRING_I32_FLAG: u8 = 0xC2;
pub const STRING_LZF_FLAG: u8 = 0xC3;

pub const TYPE_STRING_FLAG: u8 = 0x00;
pub const TYPE_LIST_FLAG: u8 = 0x01;
pub const TYPE_SET_FLAG: u8 = 0x02;
pub const TYPE_ZSET_FLAG: u8 = 0x03;
pub const TYPE_HASH_FLAG: u8 = 0x04;
pub const TYPE_HASH_ZIPMAP_FLAG: u8 = 0x09;
pub const TYPE_LIST_ZIPLIST_FLAG: u8 = 0x0A;
pub const TYPE_SET_INTSET_FLAG: u8 = 0x0B;
pub const TYPE_ZSET_ZIPLIST_FLAG: u8 = 0x0C;
pub const TYPE_HASH_ZIPLIST_FLAG: u8 = 0x0D;

// Sorted set scores: a length byte with these values carries no payload
pub const SCORE_NAN: u8 = 253;
pub const SCORE_POS_INF: u8 = 254;
pub const SCORE_NEG_INF: u8 = 255;
