//! Various constants for RESP framing

pub const CRLF: &[u8; 2] = b"\r\n";

// RESP tags
pub const BULK_STRING_TAG: u8 = b'$';
pub const ARRAY_TAG: u8 = b'*';
