use std::fmt;

use crc_fast::{CrcAlgorithm, Digest};

/// Running CRC-64 (Jones polynomial, as used by Redis) over every byte of an RDB stream
/// up to and including the end-of-file flag
pub struct Crc64 {
    checksum: Digest,
}

impl Crc64 {
    pub fn new() -> Self {
        Self {
            checksum: Digest::new(CrcAlgorithm::Crc64Redis),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.checksum.update(bytes);
    }

    /// The checksum so far, in the byte order it's stored in the file
    pub fn value(&self) -> [u8; 8] {
        self.checksum.finalize().to_le_bytes()
    }
}

impl Default for Crc64 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Crc64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Crc64")
            .field(&self.checksum.finalize())
            .finish()
    }
}
