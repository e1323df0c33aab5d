//! Storage layer for the SMS message store.
//!
//! This crate wraps one libmdbx environment and provides transactional
//! access to stored messages:
//!
//! - [`SmsEngine`] opens the environment lazily and hands out read and write
//!   transactions
//! - [`schema`] creates the tables on a fresh store and rejects unknown
//!   schema versions
//! - [`KeyAllocator`] hands out monotonically increasing message ids
//! - [`MessageRepository`] stores, loads and deletes single messages
//!
//! # Concurrency Safety
//!
//! `SmsEngine` is `Send + Sync` and meant to be shared behind an `Arc`.
//! libmdbx allows any number of concurrent readers next to one writer; the
//! service layer funnels all writes through a single writer thread.
//!
//! ```no_run
//! use common::{SmsDbConfig, SmsRecord};
//! use storage::{KeyAllocator, MessageRepository, SmsEngine};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), common::DbError> {
//! let engine = Arc::new(SmsEngine::new(SmsDbConfig::new("/tmp/sms")));
//! let allocator = KeyAllocator::recover(&engine)?;
//! let repository = MessageRepository::new(Arc::clone(&engine));
//!
//! let mut record = SmsRecord::received("+1555", "hi", 100);
//! record.id = allocator.next_key();
//! repository.put(&record)?;
//! assert_eq!(repository.get_by_id(record.id)?, record);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod key_allocator;
pub mod repository;
pub mod schema;

pub use common::{DbError, DbResult};
pub use engine::SmsEngine;
pub use key_allocator::KeyAllocator;
pub use repository::MessageRepository;
