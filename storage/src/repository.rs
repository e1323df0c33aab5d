//! Single-record operations on the message store.

use crate::engine::SmsEngine;
use crate::schema::RECORD_TABLE;
use common::{DbError, DbResult, MessageId, SmsRecord};
use indexing::keys::{self, KeyRange};
use indexing::IndexName;
use libmdbx::{NoWriteMap, Transaction, TransactionKind, WriteFlags};
use std::borrow::Cow;
use std::sync::Arc;

/// Stores, loads and deletes individual messages, keeping the index tables
/// in step with the record table.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    engine: Arc<SmsEngine>,
}

impl MessageRepository {
    pub fn new(engine: Arc<SmsEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SmsEngine> {
        &self.engine
    }

    /// Stores `record` under its id together with all its index entries, in
    /// one transaction.
    pub fn put(&self, record: &SmsRecord) -> DbResult<()> {
        let bytes = record.to_bytes()?;
        self.engine.write(|txn| {
            let table = txn.open_table(Some(RECORD_TABLE))?;
            if let Some(previous) = Self::fetch(txn, record.id)? {
                indexing::remove_entries(txn, &previous)?;
            }
            txn.put(&table, &keys::encode_id(record.id), &bytes, WriteFlags::empty())?;
            indexing::add_entries(txn, record)
        })?;

        tracing::debug!("Stored message {} ({})", record.id, record.delivery);
        Ok(())
    }

    /// Loads a message through the unique id index.
    ///
    /// Fails with `NotFound` when the index has no entry for `id` and with
    /// `Ambiguous` when it has several, or when the record it points at is
    /// missing or carries another id.
    pub fn get_by_id(&self, id: MessageId) -> DbResult<SmsRecord> {
        self.engine.read(|txn| {
            let range = KeyRange::only(&keys::encode_id(id));
            let hits = indexing::scan_keys(txn, IndexName::Id, &range, false)?;

            match hits.as_slice() {
                [] => Err(DbError::NotFound(format!("Message {}", id))),
                [key] => match Self::fetch(txn, *key)? {
                    Some(record) if record.id == id => Ok(record),
                    Some(record) => Err(DbError::Ambiguous(format!(
                        "Lookup of message {} returned message {}",
                        id, record.id
                    ))),
                    None => Err(DbError::Ambiguous(format!(
                        "Message {} is indexed but not stored",
                        id
                    ))),
                },
                many => Err(DbError::Ambiguous(format!(
                    "{} records share id {}",
                    many.len(),
                    id
                ))),
            }
        })
    }

    /// Deletes a message and its index entries, then confirms with a
    /// separate read that the id is gone.
    ///
    /// Returns whether the id is absent afterwards, not whether this call
    /// removed it. If the confirming read fails the result is
    /// `DbError::Unverified`: the delete may have happened.
    pub fn delete(&self, id: MessageId) -> DbResult<bool> {
        let removed = self.engine.write(|txn| {
            let table = txn.open_table(Some(RECORD_TABLE))?;
            match Self::fetch(txn, id)? {
                Some(record) => {
                    indexing::remove_entries(txn, &record)?;
                    txn.del(&table, &keys::encode_id(id), None)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;
        tracing::debug!("Delete of message {} issued (present: {})", id, removed);

        self.engine
            .read(|txn| indexing::count_matching(txn, IndexName::Id, &keys::encode_id(id)))
            .map(|remaining| remaining == 0)
            .map_err(|e| {
                tracing::warn!("Could not verify delete of message {}: {}", id, e);
                DbError::Unverified(format!("Message {}: {}", id, e))
            })
    }

    /// Loads the record stored under `id` inside an existing transaction.
    pub fn fetch<K: TransactionKind>(
        txn: &Transaction<'_, K, NoWriteMap>,
        id: MessageId,
    ) -> DbResult<Option<SmsRecord>> {
        let table = txn.open_table(Some(RECORD_TABLE))?;
        match txn.get::<Cow<'_, [u8]>>(&table, &keys::encode_id(id))? {
            Some(bytes) => SmsRecord::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }
}
