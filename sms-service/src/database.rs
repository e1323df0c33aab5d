//! The message store as one owned object.

use crate::message_lists::{MessageLists, NextMessage, SearchOutcome};
use crate::writer::WriteQueue;
use common::{DbError, DbResult, ListId, MessageId, SmsDbConfig, SmsFilter, SmsRecord};
use query::QueryEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{KeyAllocator, MessageRepository, SmsEngine};

/// Owns the engine, key allocator, writer thread and result lists of one
/// store.
///
/// Inserts return their id immediately and are written in the background;
/// call [`flush`](Self::flush) to wait for them. Reads run on the blocking
/// pool and see whatever has been committed.
pub struct SmsDatabase {
    engine: Arc<SmsEngine>,
    repository: MessageRepository,
    allocator: KeyAllocator,
    query: QueryEngine,
    lists: Arc<MessageLists>,
    writer: WriteQueue,
    closed: AtomicBool,
}

impl SmsDatabase {
    /// Opens (or creates) the store described by `config` and starts the
    /// writer.
    pub async fn open(config: SmsDbConfig) -> DbResult<Self> {
        let engine = Arc::new(SmsEngine::new(config));

        let allocator = {
            let engine = Arc::clone(&engine);
            run_blocking(move || KeyAllocator::recover(&engine)).await?
        };

        let repository = MessageRepository::new(Arc::clone(&engine));
        let writer = WriteQueue::start(repository.clone())?;
        let query = QueryEngine::new(Arc::clone(&engine));

        tracing::info!(
            "Message store ready at {} (last id {})",
            engine.config().path.display(),
            allocator.last_key()
        );

        Ok(Self {
            engine,
            repository,
            allocator,
            query,
            lists: Arc::new(MessageLists::new()),
            writer,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_running(&self) -> DbResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::Internal("Message store is closed".to_string()));
        }
        Ok(())
    }

    /// Stores a received message and returns its id before it is written.
    pub fn insert_received(
        &self,
        sender: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
    ) -> DbResult<MessageId> {
        self.insert(SmsRecord::received(sender, body, timestamp))
    }

    /// Stores a sent message and returns its id before it is written.
    pub fn insert_sent(
        &self,
        receiver: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
    ) -> DbResult<MessageId> {
        self.insert(SmsRecord::sent(receiver, body, timestamp))
    }

    fn insert(&self, mut record: SmsRecord) -> DbResult<MessageId> {
        self.ensure_running()?;
        record.id = self.allocator.next_key();
        let id = record.id;
        self.writer.put(record)?;
        tracing::debug!("Queued message {}", id);
        Ok(id)
    }

    /// Waits until every write queued before the call is committed.
    pub async fn flush(&self) -> DbResult<()> {
        self.ensure_running()?;
        self.writer.barrier().await
    }

    pub async fn get_message(&self, id: MessageId) -> DbResult<SmsRecord> {
        self.ensure_running()?;
        let repository = self.repository.clone();
        run_blocking(move || repository.get_by_id(id)).await
    }

    /// Deletes a message. Queued behind earlier inserts, so deleting an id
    /// right after inserting it works.
    pub async fn delete_message(&self, id: MessageId) -> DbResult<bool> {
        self.ensure_running()?;
        self.writer.delete(id).await
    }

    /// Runs a filtered search. The first match is returned directly; the
    /// rest, if any, is kept as a list to page through with
    /// [`next_in_list`](Self::next_in_list).
    pub async fn search(&self, filter: &SmsFilter, reverse: bool) -> DbResult<SearchOutcome> {
        self.ensure_running()?;
        let ids = self.query.search(filter, reverse).await?;
        if ids.is_empty() {
            return Ok(SearchOutcome::NoMatches);
        }

        let engine = Arc::clone(&self.engine);
        let lists = Arc::clone(&self.lists);
        run_blocking(move || lists.materialize(&engine, ids)).await
    }

    pub async fn next_in_list(&self, list_id: ListId) -> DbResult<NextMessage> {
        self.ensure_running()?;
        let engine = Arc::clone(&self.engine);
        let lists = Arc::clone(&self.lists);
        run_blocking(move || lists.advance(&engine, list_id)).await
    }

    /// Drops a list. Unknown ids are ignored.
    pub fn clear_list(&self, list_id: ListId) {
        self.lists.discard(list_id);
    }

    pub fn lists(&self) -> &MessageLists {
        &self.lists
    }

    /// Highest id handed out so far.
    pub fn last_id(&self) -> MessageId {
        self.allocator.last_key()
    }

    pub fn config(&self) -> &SmsDbConfig {
        self.engine.config()
    }

    /// Drains queued writes, stops the writer and closes the environment.
    /// Later calls fail; closing twice is a no-op.
    pub async fn close(&self) -> DbResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(handle) = self.writer.shutdown() {
            run_blocking(move || {
                handle
                    .join()
                    .map_err(|_| DbError::Internal("Writer thread panicked".to_string()))
            })
            .await?;
        }
        self.engine.close();
        Ok(())
    }
}

impl std::fmt::Debug for SmsDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsDatabase")
            .field("engine", &self.engine)
            .field("last_id", &self.allocator.last_key())
            .field("lists", &self.lists.len())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

async fn run_blocking<T, F>(f: F) -> DbResult<T>
where
    F: FnOnce() -> DbResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DbError::Internal(format!("Task join error: {}", e)))?
}
