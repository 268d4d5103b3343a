//! RESP encoder

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use super::*;

impl Encoder<RespValue> for RespCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: RespValue, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RespValue::String(str) => {
                dst.reserve(str.len() + 16);
                dst.put_u8(constants::BULK_STRING_TAG);
                dst.put_slice(str.len().to_string().as_bytes());
                dst.put_slice(constants::CRLF);
                dst.put_slice(&str);
                dst.put_slice(constants::CRLF);
            }
            RespValue::Array(values) => {
                dst.put_u8(constants::ARRAY_TAG);
                dst.put_slice(values.len().to_string().as_bytes());
                dst.put_slice(constants::CRLF);
                for value in values {
                    self.encode(value, dst)?;
                }
            }
        }

        trace!(
            "Building raw value: {}",
            String::from_utf8_lossy(dst).escape_debug()
        );

        Ok(())
    }
}
