//! Server-side result lists.
//!
//! A search hands its first message back right away and parks the rest of
//! its ids under a list id. Callers then walk the list one message at a
//! time and discard it when done. Lists are never expired.

use common::{DbError, DbResult, ListId, MessageId, SmsRecord};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use storage::{MessageRepository, SmsEngine};

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    NoMatches,
    /// `list_id` is only set when more messages follow `first`.
    Found {
        first: SmsRecord,
        list_id: Option<ListId>,
    },
}

/// Result of advancing a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextMessage {
    Message(SmsRecord),
    EndOfList,
}

#[derive(Debug, Default)]
pub struct MessageLists {
    lists: DashMap<ListId, VecDeque<MessageId>>,
    next_id: AtomicU64,
}

impl MessageLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the first message of `ids` and keeps the remainder as a new
    /// list. No list is created when nothing remains.
    ///
    /// Blocking: reads the store.
    pub fn materialize(&self, engine: &SmsEngine, ids: Vec<MessageId>) -> DbResult<SearchOutcome> {
        let mut ids = VecDeque::from(ids);
        let Some(head) = ids.pop_front() else {
            return Ok(SearchOutcome::NoMatches);
        };

        let first = load(engine, head)?;
        let list_id = if ids.is_empty() {
            None
        } else {
            let list_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!("Created list {} with {} messages", list_id, ids.len());
            self.lists.insert(list_id, ids);
            Some(list_id)
        };

        Ok(SearchOutcome::Found { first, list_id })
    }

    /// Pops the next id of a list and loads its message. An exhausted list
    /// stays registered until it is discarded.
    ///
    /// Blocking: reads the store.
    pub fn advance(&self, engine: &SmsEngine, list_id: ListId) -> DbResult<NextMessage> {
        let next = self
            .lists
            .get_mut(&list_id)
            .ok_or_else(|| DbError::NotFound(format!("Message list {}", list_id)))?
            .pop_front();

        match next {
            Some(id) => load(engine, id).map(NextMessage::Message),
            None => {
                tracing::debug!("List {} is exhausted", list_id);
                Ok(NextMessage::EndOfList)
            }
        }
    }

    /// Drops a list. Unknown ids are ignored.
    pub fn discard(&self, list_id: ListId) {
        if self.lists.remove(&list_id).is_some() {
            tracing::debug!("Discarded list {}", list_id);
        }
    }

    /// Number of live lists.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Ids left in a list, or `None` if the list does not exist.
    pub fn remaining(&self, list_id: ListId) -> Option<usize> {
        self.lists.get(&list_id).map(|ids| ids.len())
    }
}

fn load(engine: &SmsEngine, id: MessageId) -> DbResult<SmsRecord> {
    engine
        .read(|txn| MessageRepository::fetch(txn, id))?
        .ok_or_else(|| DbError::Inconsistent(format!("Message {} is listed but not stored", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SmsDbConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup(dir: &TempDir, count: u64) -> Arc<SmsEngine> {
        let engine = Arc::new(SmsEngine::new(SmsDbConfig::new(dir.path().join("sms"))));
        let repo = MessageRepository::new(Arc::clone(&engine));
        for id in 1..=count {
            let mut record = SmsRecord::received("+1", format!("m{}", id), id as i64);
            record.id = id;
            repo.put(&record).unwrap();
        }
        engine
    }

    #[test]
    fn test_single_match_creates_no_list() {
        let dir = TempDir::new().unwrap();
        let engine = setup(&dir, 1);
        let lists = MessageLists::new();

        match lists.materialize(&engine, vec![1]).unwrap() {
            SearchOutcome::Found { first, list_id } => {
                assert_eq!(first.id, 1);
                assert_eq!(list_id, None);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(lists.is_empty());
    }

    #[test]
    fn test_empty_ids_is_no_matches() {
        let dir = TempDir::new().unwrap();
        let engine = setup(&dir, 0);
        let lists = MessageLists::new();
        assert_eq!(
            lists.materialize(&engine, Vec::new()).unwrap(),
            SearchOutcome::NoMatches
        );
    }

    #[test]
    fn test_walk_list_to_end() {
        let dir = TempDir::new().unwrap();
        let engine = setup(&dir, 3);
        let lists = MessageLists::new();

        let SearchOutcome::Found {
            list_id: Some(list_id),
            ..
        } = lists.materialize(&engine, vec![3, 1, 2]).unwrap()
        else {
            panic!("expected a list");
        };
        assert_eq!(lists.remaining(list_id), Some(2));

        let mut seen = Vec::new();
        while let NextMessage::Message(record) = lists.advance(&engine, list_id).unwrap() {
            seen.push(record.id);
        }
        assert_eq!(seen, vec![1, 2]);

        // Exhausted lists stay until discarded
        assert_eq!(lists.remaining(list_id), Some(0));
        assert_eq!(
            lists.advance(&engine, list_id).unwrap(),
            NextMessage::EndOfList
        );
        lists.discard(list_id);
        assert!(matches!(
            lists.advance(&engine, list_id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_head_is_inconsistent() {
        let dir = TempDir::new().unwrap();
        let engine = setup(&dir, 1);
        let lists = MessageLists::new();
        assert!(matches!(
            lists.materialize(&engine, vec![42, 1]),
            Err(DbError::Inconsistent(_))
        ));
        assert!(lists.is_empty());
    }

    #[test]
    fn test_list_ids_are_distinct() {
        let dir = TempDir::new().unwrap();
        let engine = setup(&dir, 2);
        let lists = MessageLists::new();
        let a = lists.materialize(&engine, vec![1, 2]).unwrap();
        let b = lists.materialize(&engine, vec![1, 2]).unwrap();
        match (a, b) {
            (
                SearchOutcome::Found {
                    list_id: Some(a), ..
                },
                SearchOutcome::Found {
                    list_id: Some(b), ..
                },
            ) => assert_ne!(a, b),
            other => panic!("unexpected outcomes {:?}", other),
        }
        assert_eq!(lists.len(), 2);
    }
}
