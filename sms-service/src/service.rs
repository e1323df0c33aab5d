//! Request-id facade for hosts that expect notifications instead of
//! return values.
//!
//! Each asynchronous call spawns one task that ends in exactly one
//! notification to the [`RequestSink`], tagged with the caller's request
//! id. Stored records are turned into the host's message type by a
//! [`MessageFactory`].

use crate::database::SmsDatabase;
use crate::message_lists::{NextMessage, SearchOutcome};
use common::{DbResult, Delivery, ListId, MessageId, RequestError, SmsFilter, SmsRecord};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Caller-chosen tag echoed back in the notification.
pub type RequestId = u32;

/// Builds the host's message object from the six stored fields.
pub trait MessageFactory: Send + Sync + 'static {
    type Message: Send + 'static;

    fn create_message(
        &self,
        id: MessageId,
        delivery: Delivery,
        sender: Option<&str>,
        receiver: Option<&str>,
        body: &str,
        timestamp: i64,
    ) -> Self::Message;
}

/// Receives the outcome of every asynchronous request.
pub trait RequestSink<M>: Send + Sync + 'static {
    fn notify_got_sms(&self, request_id: RequestId, message: M);
    fn notify_get_sms_failed(&self, request_id: RequestId, error: RequestError);

    fn notify_sms_deleted(&self, request_id: RequestId, deleted: bool);
    fn notify_sms_delete_failed(&self, request_id: RequestId, error: RequestError);

    /// `list_id` is `None` when `first` was the only match.
    fn notify_create_message_list(&self, request_id: RequestId, first: M, list_id: Option<ListId>);
    /// A search matched nothing, or a list has no more messages.
    fn notify_no_message_in_list(&self, request_id: RequestId);
    fn notify_got_next_message(&self, request_id: RequestId, message: M);
    fn notify_read_message_list_failed(&self, request_id: RequestId, error: RequestError);
}

pub struct SmsDatabaseService<F, S>
where
    F: MessageFactory,
    S: RequestSink<F::Message>,
{
    db: Arc<SmsDatabase>,
    factory: Arc<F>,
    sink: Arc<S>,
}

impl<F, S> SmsDatabaseService<F, S>
where
    F: MessageFactory,
    S: RequestSink<F::Message>,
{
    pub fn new(db: Arc<SmsDatabase>, factory: F, sink: S) -> Self {
        Self {
            db,
            factory: Arc::new(factory),
            sink: Arc::new(sink),
        }
    }

    pub fn database(&self) -> &Arc<SmsDatabase> {
        &self.db
    }

    pub fn save_received_message(
        &self,
        sender: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
    ) -> DbResult<MessageId> {
        self.db.insert_received(sender, body, timestamp)
    }

    pub fn save_sent_message(
        &self,
        receiver: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
    ) -> DbResult<MessageId> {
        self.db.insert_sent(receiver, body, timestamp)
    }

    pub fn get_message(&self, id: MessageId, request_id: RequestId) -> JoinHandle<()> {
        let (db, factory, sink) = self.parts();
        tokio::spawn(async move {
            match db.get_message(id).await {
                Ok(record) => sink.notify_got_sms(request_id, build(&*factory, &record)),
                Err(e) => {
                    tracing::debug!("Request {}: get {} failed: {}", request_id, id, e);
                    sink.notify_get_sms_failed(request_id, e.request_error());
                }
            }
        })
    }

    pub fn delete_message(&self, id: MessageId, request_id: RequestId) -> JoinHandle<()> {
        let (db, _, sink) = self.parts();
        tokio::spawn(async move {
            match db.delete_message(id).await {
                Ok(deleted) => sink.notify_sms_deleted(request_id, deleted),
                Err(e) => {
                    tracing::debug!("Request {}: delete {} failed: {}", request_id, id, e);
                    sink.notify_sms_delete_failed(request_id, e.request_error());
                }
            }
        })
    }

    pub fn create_message_list(
        &self,
        filter: SmsFilter,
        reverse: bool,
        request_id: RequestId,
    ) -> JoinHandle<()> {
        let (db, factory, sink) = self.parts();
        tokio::spawn(async move {
            match db.search(&filter, reverse).await {
                Ok(SearchOutcome::Found { first, list_id }) => {
                    sink.notify_create_message_list(request_id, build(&*factory, &first), list_id)
                }
                Ok(SearchOutcome::NoMatches) => sink.notify_no_message_in_list(request_id),
                Err(e) => {
                    tracing::debug!("Request {}: search failed: {}", request_id, e);
                    sink.notify_read_message_list_failed(request_id, e.request_error());
                }
            }
        })
    }

    pub fn get_next_message_in_list(&self, list_id: ListId, request_id: RequestId) -> JoinHandle<()> {
        let (db, factory, sink) = self.parts();
        tokio::spawn(async move {
            match db.next_in_list(list_id).await {
                Ok(NextMessage::Message(record)) => {
                    sink.notify_got_next_message(request_id, build(&*factory, &record))
                }
                Ok(NextMessage::EndOfList) => sink.notify_no_message_in_list(request_id),
                Err(e) => {
                    tracing::debug!("Request {}: list {} failed: {}", request_id, list_id, e);
                    sink.notify_read_message_list_failed(request_id, e.request_error());
                }
            }
        })
    }

    pub fn clear_message_list(&self, list_id: ListId) {
        self.db.clear_list(list_id);
    }

    fn parts(&self) -> (Arc<SmsDatabase>, Arc<F>, Arc<S>) {
        (
            Arc::clone(&self.db),
            Arc::clone(&self.factory),
            Arc::clone(&self.sink),
        )
    }
}

fn build<F: MessageFactory>(factory: &F, record: &SmsRecord) -> F::Message {
    factory.create_message(
        record.id,
        record.delivery,
        record.sender.as_deref(),
        record.receiver.as_deref(),
        &record.body,
        record.timestamp,
    )
}
