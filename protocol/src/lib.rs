//! RESP output for decoded RDB data
//!
//! Only the request side of the protocol is needed here: commands are arrays
//! of bulk strings, which is what bulk loaders such as `redis-cli --pipe` read.

pub mod constants;
mod encoder;

use bytes::Bytes;

/// Tokio codec that encodes RESP frames.
#[derive(Debug, Default)]
pub struct RespCodec;

/// Represents a raw RESP value
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    String(Bytes),
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Build a command: an array of bulk strings, one per field
    pub fn command<I, B>(fields: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        RespValue::Array(
            fields
                .into_iter()
                .map(|field| RespValue::String(field.into()))
                .collect(),
        )
    }

    /// If value is a string, get the bytes
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RespValue::String(bytes) => Some(bytes),
            RespValue::Array(_) => None,
        }
    }
}
