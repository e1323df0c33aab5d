//! Single writer thread.
//!
//! Every mutation of the store goes through one dedicated thread fed by an
//! unbounded channel, so writes are applied one at a time and in the order
//! they were queued. Inserts are fire-and-forget; deletes and barriers
//! carry a reply channel.

use common::{DbError, DbResult, MessageId, SmsRecord};
use parking_lot::Mutex;
use std::thread::JoinHandle;
use storage::MessageRepository;
use tokio::sync::{mpsc, oneshot};

enum WriteOp {
    Put(SmsRecord),
    Delete {
        id: MessageId,
        reply: oneshot::Sender<DbResult<bool>>,
    },
    /// Answered once every op queued before it has been applied.
    Barrier(oneshot::Sender<()>),
}

/// Handle to the writer thread.
pub struct WriteQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<WriteOp>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Spawns the writer thread.
    pub fn start(repository: MessageRepository) -> DbResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = WriteExecutor { rx, repository };
        let handle = std::thread::Builder::new()
            .name("sms-writer".to_string())
            .spawn(move || executor.run())?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, op: WriteOp) -> DbResult<()> {
        self.tx
            .lock()
            .as_ref()
            .ok_or_else(closed)?
            .send(op)
            .map_err(|_| closed())
    }

    /// Queues `record` for storage. Returns before it is written.
    pub fn put(&self, record: SmsRecord) -> DbResult<()> {
        self.send(WriteOp::Put(record))
    }

    /// Deletes `id` after every write queued before it.
    pub async fn delete(&self, id: MessageId) -> DbResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(WriteOp::Delete { id, reply })?;
        rx.await.map_err(|_| closed())?
    }

    /// Waits until every write queued before this call has been applied.
    pub async fn barrier(&self) -> DbResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(WriteOp::Barrier(reply))?;
        rx.await.map_err(|_| closed())
    }

    /// Stops accepting writes. The thread drains what is queued and exits;
    /// the returned handle joins it.
    pub fn shutdown(&self) -> Option<JoinHandle<()>> {
        self.tx.lock().take();
        self.handle.lock().take()
    }
}

fn closed() -> DbError {
    DbError::Internal("Writer is not running".to_string())
}

struct WriteExecutor {
    rx: mpsc::UnboundedReceiver<WriteOp>,
    repository: MessageRepository,
}

impl WriteExecutor {
    fn run(mut self) {
        tracing::debug!("Writer started");
        while let Some(op) = self.rx.blocking_recv() {
            match op {
                WriteOp::Put(record) => {
                    // Nobody waits on an insert, so failures end here.
                    if let Err(e) = self.repository.put(&record) {
                        tracing::error!("Failed to store message {}: {}", record.id, e);
                    }
                }
                WriteOp::Delete { id, reply } => {
                    let _ = reply.send(self.repository.delete(id));
                }
                WriteOp::Barrier(reply) => {
                    let _ = reply.send(());
                }
            }
        }
        tracing::debug!("Writer stopped");
    }
}
