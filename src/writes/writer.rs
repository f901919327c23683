//! Fire-and-forget write facade.

use super::router::{PendingWrite, RouterMessage, WriteContext};
use crate::store::{StoreClient, WriteTicket};
use crate::types::{CollectionPath, DocumentPath, Fields, Operation};
use crossbeam_channel::Sender;
use serde_json::Value;
use std::sync::Arc;

/// Non-blocking create/set/update/delete.
///
/// Every method fires the store operation and returns immediately; no
/// return value communicates success, and nothing is ever raised to the
/// caller. Eventual failures surface on the error channel, asynchronously,
/// one record per failed write.
#[derive(Clone)]
pub struct Writer {
    store: Arc<dyn StoreClient>,
    intake: Sender<RouterMessage>,
}

impl Writer {
    pub(crate) fn new(store: Arc<dyn StoreClient>, intake: Sender<RouterMessage>) -> Self {
        Self { store, intake }
    }

    /// Create a document with a store-assigned id. The returned path
    /// identifies the document; it says nothing about success.
    pub fn create(&self, collection: &CollectionPath, fields: Fields) -> DocumentPath {
        let payload = Some(Value::Object(fields.clone()));
        let (path, ticket) = self.store.create(collection, fields);
        self.track(
            ticket,
            WriteContext {
                op: Operation::Create,
                path: path.raw(),
                payload,
            },
        );
        path
    }

    /// Create or overwrite the document at `path`.
    pub fn set(&self, path: &DocumentPath, fields: Fields) {
        let payload = Some(Value::Object(fields.clone()));
        let ticket = self.store.set(path, fields);
        self.track(
            ticket,
            WriteContext {
                op: Operation::Write,
                path: path.raw(),
                payload,
            },
        );
    }

    /// Merge `fields` into the document at `path`.
    pub fn update(&self, path: &DocumentPath, fields: Fields) {
        let payload = Some(Value::Object(fields.clone()));
        let ticket = self.store.update(path, fields);
        self.track(
            ticket,
            WriteContext {
                op: Operation::Update,
                path: path.raw(),
                payload,
            },
        );
    }

    /// Delete the document at `path`.
    pub fn delete(&self, path: &DocumentPath) {
        let ticket = self.store.delete(path);
        self.track(
            ticket,
            WriteContext {
                op: Operation::Delete,
                path: path.raw(),
                payload: None,
            },
        );
    }

    fn track(&self, ticket: WriteTicket, ctx: WriteContext) {
        let message = RouterMessage::Write(PendingWrite { ticket, ctx });
        if self.intake.try_send(message).is_err() {
            // Never block or fail the caller; worst case the diagnostic is lost
            tracing::warn!("write completion queue unavailable; failure report dropped");
        }
    }
}
