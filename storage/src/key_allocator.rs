//! Monotonic primary key allocation.
//!
//! The allocator recovers the highest stored id once at startup and counts
//! up from there in memory. It assumes it is the only writer of the store;
//! nothing enforces that.

use crate::engine::SmsEngine;
use crate::schema::RECORD_TABLE;
use common::{DbResult, MessageId};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct KeyAllocator {
    last: AtomicU64,
}

impl KeyAllocator {
    /// Starts counting after `last`.
    pub fn starting_at(last: MessageId) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Reads the largest id in the record table. An empty store starts at 0,
    /// so the first key handed out is 1.
    pub fn recover(engine: &SmsEngine) -> DbResult<Self> {
        let last = engine.read(|txn| {
            let table = txn.open_table(Some(RECORD_TABLE))?;
            let mut cursor = txn.cursor(&table)?;
            match cursor.last::<Cow<'_, [u8]>, ()>()? {
                Some((key, ())) => indexing::keys::decode_id(&key),
                None => Ok(0),
            }
        })?;

        tracing::debug!("Recovered key high-water mark {}", last);
        Ok(Self::starting_at(last))
    }

    /// Hands out the next key. Never touches storage.
    pub fn next_key(&self) -> MessageId {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_key(&self) -> MessageId {
        self.last.load(Ordering::SeqCst)
    }
}
