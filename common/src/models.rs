//! Data models for the SMS store.
//!
//! `SmsRecord` is the persisted shape of a message (archived with rkyv),
//! `SmsFilter` is the search descriptor handed in by a host transport.

use crate::{DbError, DbResult, MessageId};
use serde::{Deserialize, Serialize};

/// Delivery direction of a message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Sent,
    Received,
}

impl Delivery {
    /// String form stored in the `delivery` index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Delivery::Sent => "sent",
            Delivery::Received => "received",
        }
    }
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Delivery {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Delivery::Sent),
            "received" => Ok(Delivery::Received),
            other => Err(DbError::Serialization(format!(
                "Unknown delivery value: {}",
                other
            ))),
        }
    }
}

/// A stored message.
///
/// `sender` is only set on received messages and `receiver` only on sent
/// ones. Records are immutable once written.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct SmsRecord {
    pub id: MessageId,
    pub delivery: Delivery,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub body: String,
    pub timestamp: i64,
}

impl SmsRecord {
    /// A message received from `sender`. The id is assigned on insert.
    pub fn received(sender: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: 0,
            delivery: Delivery::Received,
            sender: Some(sender.into()),
            receiver: None,
            body: body.into(),
            timestamp,
        }
    }

    /// A message sent to `receiver`. The id is assigned on insert.
    pub fn sent(receiver: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: 0,
            delivery: Delivery::Sent,
            sender: None,
            receiver: Some(receiver.into()),
            body: body.into(),
            timestamp,
        }
    }

    /// Serializes the record for the record table.
    pub fn to_bytes(&self) -> DbResult<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)?;
        Ok(bytes.to_vec())
    }

    /// Deserializes a record read from the record table.
    ///
    /// The bytes are copied into an aligned buffer first: mmap'd values carry
    /// no alignment guarantee.
    pub fn from_bytes(bytes: &[u8]) -> DbResult<Self> {
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        let record = rkyv::from_bytes::<SmsRecord, rkyv::rancor::Error>(&aligned)?;
        Ok(record)
    }
}

/// Search descriptor.
///
/// Dates are inclusive bounds in milliseconds since the epoch. `numbers`
/// matches against sender OR receiver; `None` and an empty list both leave
/// that dimension out of the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmsFilter {
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub delivery: Option<Delivery>,
    pub numbers: Option<Vec<String>>,
}

impl SmsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_date(mut self, start: i64) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_end_date(mut self, end: i64) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn with_numbers<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numbers = Some(numbers.into_iter().map(Into::into).collect());
        self
    }

    /// Numbers to match, or `None` when the dimension does not apply.
    pub fn applied_numbers(&self) -> Option<&[String]> {
        match &self.numbers {
            Some(numbers) if !numbers.is_empty() => Some(numbers.as_slice()),
            _ => None,
        }
    }

    /// Inclusive timestamp bounds, `i64::MIN..=i64::MAX` when unset.
    pub fn timestamp_bounds(&self) -> (i64, i64) {
        (
            self.start_date.unwrap_or(i64::MIN),
            self.end_date.unwrap_or(i64::MAX),
        )
    }
}
