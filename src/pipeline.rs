//! Stream RDB data between async readers and writers

use std::fmt::Write as _;

use anyhow::Context;
use futures::{SinkExt, TryStreamExt};
use tinirdb_protocol::RespCodec;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::{
    commands,
    rdb::{Checksum, DecoderConfig, EncoderConfig, RdbDecoder, RdbEncoder, Record, Value},
};

/// Totals for a processed stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub version: u16,
    pub databases: u64,
    pub keys: u64,
    pub checksum: Option<Checksum>,
}

impl Summary {
    fn add(&mut self, record: &Record) {
        match record {
            Record::Header { version } => self.version = *version,
            Record::DatabaseSelector { .. } => self.databases += 1,
            Record::Key(_) => self.keys += 1,
            Record::End => {}
            Record::Checksum(checksum) => self.checksum = Some(*checksum),
        }
    }
}

/// Write a line of text for each record
#[tracing::instrument(skip_all)]
pub async fn dump(
    reader: impl AsyncRead + Unpin,
    mut writer: impl AsyncWrite + Unpin,
    config: DecoderConfig,
) -> anyhow::Result<Summary> {
    let mut records = FramedRead::new(reader, RdbDecoder::new(config));
    let mut summary = Summary::default();
    let mut line = String::new();

    while let Some(record) = records.try_next().await.context("Failed to decode RDB")? {
        summary.add(&record);
        line.clear();
        describe(&record, &mut line);
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;

    info!("Dumped {} keys", summary.keys);
    Ok(summary)
}

/// Write the commands that recreate the data, in RESP
#[tracing::instrument(skip_all)]
pub async fn to_protocol(
    reader: impl AsyncRead + Unpin,
    writer: impl AsyncWrite + Unpin,
    config: DecoderConfig,
) -> anyhow::Result<Summary> {
    let mut records = FramedRead::new(reader, RdbDecoder::new(config));
    let mut commands = FramedWrite::new(writer, RespCodec);
    let mut summary = Summary::default();

    while let Some(record) = records.try_next().await.context("Failed to decode RDB")? {
        summary.add(&record);
        for command in commands::record_commands(&record) {
            commands.feed(command).await?;
        }
    }
    commands.flush().await?;

    info!("Wrote commands for {} keys", summary.keys);
    Ok(summary)
}

/// Decode an RDB stream and encode it again
#[tracing::instrument(skip_all)]
pub async fn rewrite(
    reader: impl AsyncRead + Unpin,
    writer: impl AsyncWrite + Unpin,
    decoder_config: DecoderConfig,
    encoder_config: EncoderConfig,
) -> anyhow::Result<Summary> {
    let mut records = FramedRead::new(reader, RdbDecoder::new(decoder_config));
    let mut output = FramedWrite::new(writer, RdbEncoder::new(encoder_config));
    let mut summary = Summary::default();

    while let Some(record) = records.try_next().await.context("Failed to decode RDB")? {
        summary.add(&record);
        output
            .feed(record)
            .await
            .context("Failed to encode RDB")?;
    }
    output.flush().await?;

    debug!("Rewrote {} keys in {} databases", summary.keys, summary.databases);
    Ok(summary)
}

/// Human readable description of a record
fn describe(record: &Record, out: &mut String) {
    match record {
        Record::Header { version } => {
            let _ = write!(out, "RDB version {version}");
        }
        Record::DatabaseSelector { number } => {
            let _ = write!(out, "SELECT {number}");
        }
        Record::Key(entry) => {
            let _ = write!(
                out,
                "[db{}] {} {:?}",
                entry.database,
                entry.rtype(),
                String::from_utf8_lossy(&entry.key)
            );
            if let Some(expiry) = entry.expiry {
                let _ = write!(out, " (expires at {expiry})");
            }
            out.push_str(" => ");
            describe_value(&entry.value, out);
        }
        Record::End => out.push_str("END"),
        Record::Checksum(Checksum::Verified) => out.push_str("CHECKSUM verified"),
        Record::Checksum(Checksum::Disabled) => out.push_str("CHECKSUM disabled"),
    }
}

fn describe_value(value: &Value, out: &mut String) {
    let text = |bytes: &[u8]| format!("{:?}", String::from_utf8_lossy(bytes));
    let joined = match value {
        Value::Str(value) => text(value),
        Value::List(items) | Value::Set(items) => {
            let items: Vec<_> = items.iter().map(|item| text(item)).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Hash(pairs) | Value::SortedSet(pairs) => {
            let pairs: Vec<_> = pairs
                .iter()
                .map(|(a, b)| format!("{}: {}", text(a), text(b)))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        }
    };
    out.push_str(&joined);
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::fs::File;

    use super::*;
    use crate::rdb::{DecodeError, DecodeErrorKind};

    /// `REDIS0006`, db 0, `foo` => `bar`, `n` => 12345 expiring, end, checksum
    fn rdb_file() -> Vec<u8> {
        let body = [
            b"REDIS0006".as_slice(),
            &[0xFE, 0x00],
            &[0x00, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r'],
            &[0xFC, 0x15, 0x72, 0xE7, 0x07, 0x8F, 0x01, 0x00, 0x00],
            &[0x00, 0x01, b'n', 0xC1, 0x39, 0x30],
            &[0x01, 0x01, b'l', 0x00],
            &[0xFF],
        ]
        .concat();
        let mut crc = crate::rdb::Crc64::new();
        crc.push(&body);
        [body.as_slice(), &crc.value()].concat()
    }

    #[tokio::test]
    async fn dump_lines() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let summary = dump(&rdb_file()[..], &mut out, DecoderConfig::default()).await?;
        assert_eq!(
            summary,
            Summary {
                version: 6,
                databases: 1,
                keys: 3,
                checksum: Some(Checksum::Verified),
            }
        );

        let out = String::from_utf8(out)?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "RDB version 6",
                "SELECT 0",
                "[db0] string \"foo\" => \"bar\"",
                "[db0] string \"n\" (expires at 1713824559637) => \"12345\"",
                "[db0] list \"l\" => []",
                "END",
                "CHECKSUM verified",
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn protocol_output() -> anyhow::Result<()> {
        let mut out = Vec::new();
        to_protocol(&rdb_file()[..], &mut out, DecoderConfig::default()).await?;
        let expected = concat!(
            "*2\r\n$6\r\nSELECT\r\n$1\r\n0\r\n",
            "*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n",
            "*3\r\n$3\r\nSET\r\n$1\r\nn\r\n$5\r\n12345\r\n",
            "*3\r\n$9\r\nPEXPIREAT\r\n$1\r\nn\r\n$13\r\n1713824559637\r\n",
        );
        assert_eq!(String::from_utf8(out)?, expected);

        Ok(())
    }

    #[tokio::test]
    async fn rewrite_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input_path = dir.path().join("dump.rdb");
        let output_path = dir.path().join("rewritten.rdb");
        tokio::fs::write(&input_path, rdb_file()).await?;

        let input = File::open(&input_path).await?;
        let output = File::create(&output_path).await?;
        let summary = rewrite(
            input,
            output,
            DecoderConfig::default(),
            EncoderConfig::default(),
        )
        .await?;
        assert_eq!(summary.keys, 3);

        // same records, and the freshly written checksum verifies
        let rewritten = tokio::fs::read(&output_path).await?;
        let mut original_dump = Vec::new();
        let mut rewritten_dump = Vec::new();
        dump(&rdb_file()[..], &mut original_dump, DecoderConfig::default()).await?;
        let summary = dump(&rewritten[..], &mut rewritten_dump, DecoderConfig::default()).await?;
        assert_eq!(original_dump, rewritten_dump);
        assert_eq!(summary.checksum, Some(Checksum::Verified));

        Ok(())
    }

    #[tokio::test]
    async fn decode_failure() {
        let mut file = rdb_file();
        file.truncate(19);
        let err = dump(Cursor::new(file), tokio::io::sink(), DecoderConfig::default())
            .await
            .unwrap_err();
        let err = err.downcast_ref::<DecodeError>().unwrap();
        assert!(matches!(err.kind, DecodeErrorKind::Truncated { offset: 19 }));
        assert_eq!(err.offset, 11);
    }
}
