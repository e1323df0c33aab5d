//! Common types and utilities shared across the SMS store crates.
//!
//! This crate provides the record and filter models, error definitions,
//! configuration and logging setup used by every other crate in the
//! workspace (storage, indexing, query, sms-service).
//!
//! # Architecture
//!
//! The `common` crate sits at the bottom of the dependency hierarchy:
//! - Has NO dependencies on other workspace crates
//! - Provides shared types that all other crates can use
//! - Ensures type consistency across the entire system

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod platform;

// --- Core Type Aliases ---

/// Primary key of a stored message.
///
/// Assigned monotonically by the key allocator and never reused, even after
/// the message is deleted.
pub type MessageId = u64;

/// Identifier of a server-side message list (search cursor).
///
/// Drawn from a counter that is independent of [`MessageId`].
pub type ListId = u64;

pub use config::SmsDbConfig;
pub use errors::{DbError, DbResult, RequestError};
pub use models::{Delivery, SmsFilter, SmsRecord};

/// Database name, also used as the on-disk directory name.
pub const DB_NAME: &str = "sms";

/// Schema version written on first creation. There is no migration path.
pub const SCHEMA_VERSION: u32 = 1;
