//! Byte layouts for primary and index keys.
//!
//! # Key Format
//!
//! ```text
//! record table:   id(8, BE)
//! string index:   len(4, BE) ++ utf8 ++ id(8, BE)
//! timestamp:      (ts ^ i64::MIN)(8, BE) ++ id(8, BE)
//! id index:       id(8, BE) ++ id(8, BE)
//! ```
//!
//! Every index key ends with the primary key, so one value maps to many
//! records and entries for the same value sort by id. The value part is
//! self-delimiting, which makes an exact match a plain range
//! `value ++ 0x00.. ..= value ++ 0xFF..`.

use common::{DbError, DbResult, MessageId};

/// Width of an encoded primary key.
pub const ID_LEN: usize = 8;

/// Encodes a primary key so that byte order equals numeric order.
pub fn encode_id(id: MessageId) -> [u8; ID_LEN] {
    id.to_be_bytes()
}

/// Decodes a record-table key.
pub fn decode_id(bytes: &[u8]) -> DbResult<MessageId> {
    let raw: [u8; ID_LEN] = bytes
        .try_into()
        .map_err(|_| DbError::Serialization(format!("Bad primary key length: {}", bytes.len())))?;
    Ok(MessageId::from_be_bytes(raw))
}

/// Encodes a timestamp so that byte order equals numeric order, negative
/// values included.
pub fn encode_timestamp(timestamp: i64) -> [u8; 8] {
    ((timestamp as u64) ^ (1u64 << 63)).to_be_bytes()
}

/// Length-prefixed string value. Fails for strings whose length does not
/// fit the 4-byte prefix.
pub fn encode_str(value: &str) -> DbResult<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + value.len());
    out.extend_from_slice(&length_prefix(value.len())?);
    out.extend_from_slice(value.as_bytes());
    Ok(out)
}

fn length_prefix(len: usize) -> DbResult<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| DbError::Serialization(format!("Index value too long: {} bytes", len)))
}

/// Full index key for `value` pointing at `id`.
pub fn index_key(value: &[u8], id: MessageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(value.len() + ID_LEN);
    key.extend_from_slice(value);
    key.extend_from_slice(&encode_id(id));
    key
}

/// Extracts the primary key carried at the end of an index key.
pub fn primary_key_of(index_key: &[u8]) -> DbResult<MessageId> {
    if index_key.len() < ID_LEN {
        return Err(DbError::Serialization(format!(
            "Index key too short: {} bytes",
            index_key.len()
        )));
    }
    decode_id(&index_key[index_key.len() - ID_LEN..])
}

/// Inclusive key range covering every entry whose value lies between
/// `low` and `high`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Vec<u8>,
    pub upper: Vec<u8>,
}

impl KeyRange {
    /// Entries whose value equals `value`.
    pub fn only(value: &[u8]) -> Self {
        Self::between(value, value)
    }

    /// Entries whose value lies in `low..=high`.
    pub fn between(low: &[u8], high: &[u8]) -> Self {
        Self {
            lower: index_key(low, MessageId::MIN),
            upper: index_key(high, MessageId::MAX),
        }
    }

    /// Timestamps in `start..=end`.
    pub fn timestamps(start: i64, end: i64) -> Self {
        Self::between(&encode_timestamp(start), &encode_timestamp(end))
    }

    /// A range no key can fall into.
    pub fn is_empty(&self) -> bool {
        self.lower > self.upper
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.lower.as_slice() && key <= self.upper.as_slice()
    }
}
