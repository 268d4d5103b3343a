//! Redis commands that recreate decoded RDB data

use bytes::Bytes;
use tinirdb_protocol::RespValue;

use crate::rdb::{KeyEntry, Record, Value};

/// Commands that reproduce a record. Records without data give none.
pub fn record_commands(record: &Record) -> Vec<RespValue> {
    match record {
        Record::DatabaseSelector { number } => vec![select(*number)],
        Record::Key(entry) => key_commands(entry),
        Record::Header { .. } | Record::End | Record::Checksum(_) => Vec::new(),
    }
}

pub fn select(database: u32) -> RespValue {
    RespValue::command([Bytes::from_static(b"SELECT"), Bytes::from(database.to_string())])
}

/// Write the key's value, then set its expiry. Empty collections can't exist in Redis, so
/// those produce nothing.
pub fn key_commands(entry: &KeyEntry) -> Vec<RespValue> {
    let key = &entry.key;
    let data = match &entry.value {
        Value::Str(value) => command("SET", key, [value.clone()]),
        Value::List(items) if !items.is_empty() => command("RPUSH", key, items.iter().cloned()),
        Value::Set(members) if !members.is_empty() => {
            command("SADD", key, members.iter().cloned())
        }
        Value::SortedSet(pairs) if !pairs.is_empty() => command(
            "ZADD",
            key,
            pairs
                .iter()
                .flat_map(|(member, score)| [score.clone(), member.clone()]),
        ),
        Value::Hash(pairs) if !pairs.is_empty() => command(
            "HSET",
            key,
            pairs
                .iter()
                .flat_map(|(field, value)| [field.clone(), value.clone()]),
        ),
        _ => return Vec::new(),
    };

    match entry.expiry {
        Some(expiry) => vec![
            data,
            command("PEXPIREAT", key, [Bytes::from(expiry.to_string())]),
        ],
        None => vec![data],
    }
}

fn command(name: &'static str, key: &Bytes, args: impl IntoIterator<Item = Bytes>) -> RespValue {
    RespValue::command(
        [Bytes::from_static(name.as_bytes()), key.clone()]
            .into_iter()
            .chain(args),
    )
}
