//! Secondary indexes over stored messages.
//!
//! Each index is its own libmdbx table holding composite keys
//! `value ++ id` with empty values (see [`keys`]). Entries are written in
//! the same RW transaction as the record they describe, so a committed
//! record and its index entries always agree.
//!
//! | Index       | Table            | Value            | Present when          |
//! |-------------|------------------|------------------|-----------------------|
//! | `Id`        | `sms.id`         | id               | always                |
//! | `Delivery`  | `sms.delivery`   | `"sent"`/`"received"` | always           |
//! | `Sender`    | `sms.sender`     | sender number    | received messages     |
//! | `Receiver`  | `sms.receiver`   | receiver number  | sent messages         |
//! | `Timestamp` | `sms.timestamp`  | timestamp        | always                |

pub mod keys;

use common::{DbResult, MessageId, SmsRecord};
use keys::KeyRange;
use libmdbx::{NoWriteMap, Transaction, TransactionKind, WriteFlags, RW};
use std::borrow::Cow;

/// Environment flavour used throughout the store.
pub type Env = libmdbx::Database<NoWriteMap>;

/// The secondary indexes kept for every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    Id,
    Delivery,
    Sender,
    Receiver,
    Timestamp,
}

impl IndexName {
    pub const ALL: [IndexName; 5] = [
        IndexName::Id,
        IndexName::Delivery,
        IndexName::Sender,
        IndexName::Receiver,
        IndexName::Timestamp,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            IndexName::Id => "sms.id",
            IndexName::Delivery => "sms.delivery",
            IndexName::Sender => "sms.sender",
            IndexName::Receiver => "sms.receiver",
            IndexName::Timestamp => "sms.timestamp",
        }
    }

    /// Encoded index value for `record`, or `None` if the record has no
    /// entry in this index.
    pub fn value_of(self, record: &SmsRecord) -> DbResult<Option<Vec<u8>>> {
        Ok(match self {
            IndexName::Id => Some(keys::encode_id(record.id).to_vec()),
            IndexName::Delivery => Some(keys::encode_str(record.delivery.as_str())?),
            IndexName::Sender => record.sender.as_deref().map(keys::encode_str).transpose()?,
            IndexName::Receiver => record.receiver.as_deref().map(keys::encode_str).transpose()?,
            IndexName::Timestamp => Some(keys::encode_timestamp(record.timestamp).to_vec()),
        })
    }
}

impl std::fmt::Display for IndexName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// All `(index, key)` pairs describing `record`.
pub fn entries_for(record: &SmsRecord) -> DbResult<Vec<(IndexName, Vec<u8>)>> {
    let mut entries = Vec::with_capacity(IndexName::ALL.len());
    for index in IndexName::ALL {
        if let Some(value) = index.value_of(record)? {
            entries.push((index, keys::index_key(&value, record.id)));
        }
    }
    Ok(entries)
}

/// Writes every index entry for `record`.
pub fn add_entries(txn: &Transaction<'_, RW, NoWriteMap>, record: &SmsRecord) -> DbResult<()> {
    for (index, key) in entries_for(record)? {
        let table = txn.open_table(Some(index.table_name()))?;
        txn.put(&table, &key, b"", WriteFlags::empty())?;
    }
    tracing::trace!("Indexed message {}", record.id);
    Ok(())
}

/// Removes every index entry for `record`. Entries that are already gone
/// are ignored.
pub fn remove_entries(txn: &Transaction<'_, RW, NoWriteMap>, record: &SmsRecord) -> DbResult<()> {
    for (index, key) in entries_for(record)? {
        let table = txn.open_table(Some(index.table_name()))?;
        txn.del(&table, &key, None)?;
    }
    tracing::trace!("Unindexed message {}", record.id);
    Ok(())
}

/// Primary keys of the entries of `index` whose keys fall inside `range`,
/// in key order, or in reverse key order when `reverse` is set.
pub fn scan_keys<K: TransactionKind>(
    txn: &Transaction<'_, K, NoWriteMap>,
    index: IndexName,
    range: &KeyRange,
    reverse: bool,
) -> DbResult<Vec<MessageId>> {
    let mut ids = Vec::new();
    if range.is_empty() {
        return Ok(ids);
    }

    let table = txn.open_table(Some(index.table_name()))?;
    let mut cursor = txn.cursor(&table)?;

    if !reverse {
        let mut entry = cursor.set_range::<Cow<'_, [u8]>, ()>(&range.lower)?;
        while let Some((key, ())) = entry {
            if &key[..] > range.upper.as_slice() {
                break;
            }
            ids.push(keys::primary_key_of(&key)?);
            entry = cursor.next::<Cow<'_, [u8]>, ()>()?;
        }
    } else {
        // Land on the last key <= upper.
        let mut entry = match cursor.set_range::<Cow<'_, [u8]>, ()>(&range.upper)? {
            Some((key, ())) if &key[..] <= range.upper.as_slice() => Some((key, ())),
            Some(_) => cursor.prev::<Cow<'_, [u8]>, ()>()?,
            None => cursor.last::<Cow<'_, [u8]>, ()>()?,
        };
        while let Some((key, ())) = entry {
            if &key[..] < range.lower.as_slice() {
                break;
            }
            ids.push(keys::primary_key_of(&key)?);
            entry = cursor.prev::<Cow<'_, [u8]>, ()>()?;
        }
    }

    tracing::trace!("Scanned {} entries from {}", ids.len(), index);
    Ok(ids)
}

/// Number of entries in `index` whose value equals `value`.
pub fn count_matching<K: TransactionKind>(
    txn: &Transaction<'_, K, NoWriteMap>,
    index: IndexName,
    value: &[u8],
) -> DbResult<usize> {
    Ok(scan_keys(txn, index, &KeyRange::only(value), false)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Delivery;

    #[test]
    fn test_received_record_has_no_receiver_entry() {
        let mut record = SmsRecord::received("+1555", "hi", 10);
        record.id = 4;
        let names: Vec<IndexName> = entries_for(&record).unwrap().into_iter().map(|(i, _)| i).collect();
        assert_eq!(
            names,
            vec![
                IndexName::Id,
                IndexName::Delivery,
                IndexName::Sender,
                IndexName::Timestamp
            ]
        );
    }

    #[test]
    fn test_sent_record_has_no_sender_entry() {
        let mut record = SmsRecord::sent("+1777", "yo", 10);
        record.id = 9;
        let entries = entries_for(&record).unwrap();
        assert!(entries.iter().all(|(i, _)| *i != IndexName::Sender));
        assert!(entries.iter().any(|(i, _)| *i == IndexName::Receiver));
    }

    #[test]
    fn test_delivery_value() {
        let record = SmsRecord::sent("+1777", "yo", 10);
        assert_eq!(
            IndexName::Delivery.value_of(&record).unwrap(),
            Some(keys::encode_str(Delivery::Sent.as_str()).unwrap())
        );
    }

    #[test]
    fn test_missing_number_has_no_value() {
        let record = SmsRecord::received("+1555", "hi", 10);
        assert_eq!(IndexName::Receiver.value_of(&record).unwrap(), None);
    }

    #[test]
    fn test_table_names_are_distinct() {
        let mut names: Vec<&str> = IndexName::ALL.iter().map(|i| i.table_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), IndexName::ALL.len());
    }
}
