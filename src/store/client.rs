//! Client-side contract for the remote document store.

use crate::types::{
    CollectionPath, DocSnapshot, DocumentPath, Fields, Operation, QueryDescriptor, QuerySnapshot,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::time::Duration;

/// A request the store refused, in store terms (raw path, no actor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeniedRequest {
    pub op: Operation,
    pub path: String,
}

impl fmt::Display for DeniedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} denied", self.op.method(), self.path)
    }
}

/// Events delivered on a watch channel.
#[derive(Clone, Debug)]
pub enum WatchEvent<S> {
    /// A fresh snapshot; replaces anything delivered before it.
    Snapshot(S),
    /// The store refused the watch. The channel carries nothing further.
    Denied(DeniedRequest),
}

/// Unique identifier for a watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Handle to an open push channel.
///
/// Consumers pull events off the receiver; closing (or dropping) the handle
/// unregisters the producer side so no subscription leaks.
pub struct WatchHandle<S> {
    id: WatchId,
    receiver: Receiver<WatchEvent<S>>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl<S> WatchHandle<S> {
    pub fn new(
        id: WatchId,
        receiver: Receiver<WatchEvent<S>>,
        on_close: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            receiver,
            on_close: Some(Box::new(on_close)),
        }
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<WatchEvent<S>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<WatchEvent<S>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Close the channel and unregister from the store.
    pub fn close(mut self) {
        self.run_close();
    }

    fn run_close(&mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }
}

impl<S> Drop for WatchHandle<S> {
    fn drop(&mut self) {
        self.run_close();
    }
}

/// Outcome of a deferred write.
pub type WriteOutcome = Result<(), DeniedRequest>;

/// One-shot deferred result of a write primitive.
///
/// The write itself returns immediately; the outcome arrives here later.
pub struct WriteTicket {
    receiver: Receiver<WriteOutcome>,
}

impl WriteTicket {
    pub fn new(receiver: Receiver<WriteOutcome>) -> Self {
        Self { receiver }
    }

    /// The underlying receiver, for select loops.
    pub fn receiver(&self) -> &Receiver<WriteOutcome> {
        &self.receiver
    }

    /// Wait for the outcome. `None` if the store dropped the ticket
    /// without resolving it or the timeout elapsed.
    pub fn wait(&self, timeout: Duration) -> Option<WriteOutcome> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// The remote document store, as this layer consumes it.
///
/// Watches never fail synchronously: a refused watch delivers
/// [`WatchEvent::Denied`] on its channel. Writes return a ticket whose
/// outcome resolves later.
pub trait StoreClient: Send + Sync {
    /// Open a push channel for a collection query.
    fn watch_query(&self, query: &QueryDescriptor) -> WatchHandle<QuerySnapshot>;

    /// Open a push channel for a single document.
    fn watch_document(&self, path: &DocumentPath) -> WatchHandle<DocSnapshot>;

    /// Create a document with a store-assigned id.
    fn create(&self, collection: &CollectionPath, fields: Fields) -> (DocumentPath, WriteTicket);

    /// Create or overwrite the document at `path`.
    fn set(&self, path: &DocumentPath, fields: Fields) -> WriteTicket;

    /// Merge `fields` into the existing document at `path`.
    fn update(&self, path: &DocumentPath, fields: Fields) -> WriteTicket;

    /// Delete the document at `path`.
    fn delete(&self, path: &DocumentPath) -> WriteTicket;
}
