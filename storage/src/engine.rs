//! Lazily opened libmdbx environment for the message store.
//!
//! `SmsEngine` owns the configuration and a cached handle to the
//! environment. Every transaction goes through [`SmsEngine::ensure_open`],
//! so a failed open is reported to whoever asked for the transaction and the
//! next request tries again.

use crate::schema::{self, SchemaState};
use common::{platform, DbError, DbResult, SmsDbConfig};
use indexing::Env;
use libmdbx::{DatabaseOptions, NoWriteMap, Transaction, RO, RW};
use parking_lot::Mutex;
use std::sync::Arc;

/// Storage engine adapter around a single libmdbx environment.
pub struct SmsEngine {
    config: SmsDbConfig,
    env: Mutex<Option<Arc<Env>>>,
}

impl SmsEngine {
    /// Creates an engine for `config`. Nothing is opened until the first
    /// transaction.
    pub fn new(config: SmsDbConfig) -> Self {
        Self {
            config,
            env: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SmsDbConfig {
        &self.config
    }

    /// Returns the open environment, opening it (and creating the schema on
    /// a fresh store) on first use.
    pub fn ensure_open(&self) -> DbResult<Arc<Env>> {
        let mut slot = self.env.lock();
        if let Some(env) = slot.as_ref() {
            return Ok(Arc::clone(env));
        }

        let env = match self.open_env() {
            Ok(env) => Arc::new(env),
            Err(e) if e.is_open_failure() => {
                tracing::error!("Cannot open message store: {}", e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        *slot = Some(Arc::clone(&env));
        Ok(env)
    }

    fn open_env(&self) -> DbResult<Env> {
        self.config.validate()?;
        let path = &self.config.path;
        platform::ensure_db_directory(path)
            .map_err(|e| DbError::Open(format!("{}: {}", path.display(), e)))?;

        let mut options = DatabaseOptions::default();
        options.max_tables = Some(self.config.max_tables);

        let env = Env::open_with_options(path, options).map_err(|e| open_error(path, e))?;

        // Dropping the transaction on error aborts it.
        let txn = env.begin_rw_txn().map_err(|e| open_error(path, e))?;
        let state = schema::prepare(&txn)?;
        txn.commit().map_err(|e| open_error(path, e))?;

        match state {
            SchemaState::Created => {
                tracing::info!("Created message store at {}", path.display())
            }
            SchemaState::Current => {
                tracing::info!("Opened message store at {}", path.display())
            }
        }
        Ok(env)
    }

    /// Runs `f` inside a read-only transaction.
    pub fn read<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_, RO, NoWriteMap>) -> DbResult<T>,
    {
        let env = self.ensure_open()?;
        let txn = env.begin_ro_txn()?;
        tracing::debug!("Read transaction {} started", txn.id());
        f(&txn)
    }

    /// Runs `f` inside a read-write transaction, committing when it returns
    /// `Ok`. On `Err` the transaction is aborted.
    pub fn write<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_, RW, NoWriteMap>) -> DbResult<T>,
    {
        let env = self.ensure_open()?;
        let txn = env.begin_rw_txn()?;
        let id = txn.id();
        tracing::debug!("Write transaction {} started", id);

        let value = f(&txn)?;
        txn.commit()?;
        tracing::debug!("Write transaction {} committed", id);
        Ok(value)
    }

    /// Drops the cached environment. Transactions still running keep their
    /// own handle; the next request reopens.
    pub fn close(&self) {
        if self.env.lock().take().is_some() {
            tracing::info!("Closed message store at {}", self.config.path.display());
        }
    }

    pub fn is_open(&self) -> bool {
        self.env.lock().is_some()
    }
}

impl std::fmt::Debug for SmsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsEngine")
            .field("path", &self.config.path)
            .field("open", &self.is_open())
            .finish()
    }
}

fn open_error(path: &std::path::Path, err: libmdbx::Error) -> DbError {
    match err {
        libmdbx::Error::Busy => DbError::Blocked(path.display().to_string()),
        other => DbError::Open(format!("{}: {}", path.display(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_is_lazy_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = SmsEngine::new(SmsDbConfig::new(dir.path().join("sms")));
        assert!(!engine.is_open());

        let first = engine.ensure_open().unwrap();
        let second = engine.ensure_open().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(engine.is_open());
    }

    #[test]
    fn test_close_then_reopen() {
        let dir = TempDir::new().unwrap();
        let engine = SmsEngine::new(SmsDbConfig::new(dir.path().join("sms")));
        engine.ensure_open().unwrap();
        engine.close();
        assert!(!engine.is_open());
        engine.read(|_| Ok(())).unwrap();
        assert!(engine.is_open());
    }

    #[test]
    fn test_invalid_config_fails_open() {
        let dir = TempDir::new().unwrap();
        let config = SmsDbConfig::new(dir.path().join("sms")).with_max_tables(2);
        let engine = SmsEngine::new(config);
        assert!(matches!(
            engine.read(|_| Ok(())),
            Err(DbError::Configuration(_))
        ));
        assert!(!engine.is_open());
    }

    #[test]
    fn test_path_under_a_file_fails_open() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"not a directory").unwrap();

        let engine = SmsEngine::new(SmsDbConfig::new(file.join("sms")));
        let err = engine.ensure_open().unwrap_err();
        assert!(matches!(err, DbError::Open(_)), "got {:?}", err);
        assert!(err.is_open_failure());
        assert!(!engine.is_open());
    }

    #[test]
    fn test_busy_maps_to_blocked() {
        let path = std::path::Path::new("/tmp/sms");
        assert!(matches!(
            open_error(path, libmdbx::Error::Busy),
            DbError::Blocked(_)
        ));
        assert!(matches!(
            open_error(path, libmdbx::Error::Corrupted),
            DbError::Open(_)
        ));
    }

    #[test]
    fn test_write_error_aborts() {
        let dir = TempDir::new().unwrap();
        let engine = SmsEngine::new(SmsDbConfig::new(dir.path().join("sms")));

        let result: DbResult<()> = engine.write(|txn| {
            let table = txn.open_table(Some(schema::META_TABLE))?;
            txn.put(&table, b"scratch", b"1", libmdbx::WriteFlags::empty())?;
            Err(DbError::Internal("boom".to_string()))
        });
        assert!(result.is_err());

        let stored = engine
            .read(|txn| {
                let table = txn.open_table(Some(schema::META_TABLE))?;
                Ok(txn
                    .get::<std::borrow::Cow<'_, [u8]>>(&table, b"scratch")?
                    .is_some())
            })
            .unwrap();
        assert!(!stored);
    }
}
