//! Asynchronous SMS message store.
//!
//! Ties the storage, query and list layers together behind one owned
//! object:
//!
//! - [`SmsDatabase`]: async API returning `DbResult` values
//! - [`SmsDatabaseService`]: request-id facade that reports every outcome to
//!   a [`RequestSink`]
//!
//! # Example
//!
//! ```no_run
//! use common::{SmsDbConfig, SmsFilter};
//! use sms_service::{NextMessage, SearchOutcome, SmsDatabase};
//!
//! # async fn example() -> common::DbResult<()> {
//! let config = SmsDbConfig::from_file("/etc/sms/store.toml")?;
//! common::logging::init_tracing_from(&config);
//! let db = SmsDatabase::open(config).await?;
//! db.insert_received("+1555", "hi", 100)?;
//! db.insert_sent("+1777", "yo", 200)?;
//! db.flush().await?;
//!
//! if let SearchOutcome::Found { first, list_id } = db.search(&SmsFilter::default(), false).await? {
//!     println!("{}", first.body);
//!     if let Some(list_id) = list_id {
//!         while let NextMessage::Message(next) = db.next_in_list(list_id).await? {
//!             println!("{}", next.body);
//!         }
//!         db.clear_list(list_id);
//!     }
//! }
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

mod database;
pub mod message_lists;
pub mod service;
mod writer;

pub use database::SmsDatabase;
pub use message_lists::{MessageLists, NextMessage, SearchOutcome};
pub use service::{MessageFactory, RequestId, RequestSink, SmsDatabaseService};
