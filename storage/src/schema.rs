//! Table layout and schema versioning.
//!
//! A store holds one record table keyed by message id, the five index
//! tables from [`indexing::IndexName`] and a small meta table carrying the
//! schema version. The version is written once, when the store is created.
//! There is no migration path: any other stored version is fatal.

use common::{DbError, DbResult, SCHEMA_VERSION};
use indexing::IndexName;
use libmdbx::{NoWriteMap, TableFlags, Transaction, TransactionKind, WriteFlags, RW};
use std::borrow::Cow;

/// Records keyed by 8-byte big-endian id.
pub const RECORD_TABLE: &str = common::DB_NAME;

/// Store-level metadata.
pub const META_TABLE: &str = "sms.meta";

/// Key of the schema version in [`META_TABLE`].
pub const VERSION_KEY: &[u8] = b"schema_version";

/// What [`prepare`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Fresh store, tables were created.
    Created,
    /// Existing store at the supported version.
    Current,
}

/// Checks the stored schema version and creates the tables on a fresh
/// store. On `Err` the caller must drop `txn` without committing.
pub fn prepare(txn: &Transaction<'_, RW, NoWriteMap>) -> DbResult<SchemaState> {
    let meta = txn.create_table(Some(META_TABLE), TableFlags::empty())?;
    let found = match txn.get::<Cow<'_, [u8]>>(&meta, VERSION_KEY)? {
        Some(bytes) => decode_version(&bytes)?,
        None => 0,
    };

    if found == SCHEMA_VERSION {
        return Ok(SchemaState::Current);
    }
    if found != 0 {
        return Err(DbError::Version {
            found,
            expected: SCHEMA_VERSION,
        });
    }

    txn.create_table(Some(RECORD_TABLE), TableFlags::empty())?;
    for index in IndexName::ALL {
        txn.create_table(Some(index.table_name()), TableFlags::empty())?;
    }
    txn.put(
        &meta,
        VERSION_KEY,
        &SCHEMA_VERSION.to_be_bytes(),
        WriteFlags::empty(),
    )?;

    tracing::info!("Created schema version {}", SCHEMA_VERSION);
    Ok(SchemaState::Created)
}

/// Reads the stored schema version, 0 when none was written.
pub fn stored_version<K: TransactionKind>(txn: &Transaction<'_, K, NoWriteMap>) -> DbResult<u32> {
    let meta = txn.open_table(Some(META_TABLE))?;
    match txn.get::<Cow<'_, [u8]>>(&meta, VERSION_KEY)? {
        Some(bytes) => decode_version(&bytes),
        None => Ok(0),
    }
}

fn decode_version(bytes: &[u8]) -> DbResult<u32> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| {
        DbError::Serialization(format!("Bad schema version length: {}", bytes.len()))
    })?;
    Ok(u32::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_version() {
        assert_eq!(decode_version(&7u32.to_be_bytes()).unwrap(), 7);
        assert!(decode_version(&[1, 2]).is_err());
    }
}
